//! In-memory corpus of normalized sentences.
//!
//! A corpus is parsed once and then shared, read-only, by the vocabulary
//! builder, the count matrix and the scorer.

use std::path::Path;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{LmError, Result};
use crate::io::{get_filename, read_file};
use crate::text::Normalizer;

/// A normalized (case-folded, stemmed) word form.
pub type Token = String;

/// Ordered tokens of one line.
pub type Sentence = Vec<Token>;

/// Ordered sequence of sentences, one per input line.
///
/// # Invariants
/// - Blank lines are kept as zero-length sentences so that indices match
///   line numbers and the scorer can skip them explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
	name: Option<String>,
	sentences: Vec<Sentence>,
}

impl Corpus {
	/// Builds a corpus from already normalized sentences.
	pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
		Self { name: None, sentences }
	}

	/// Normalizes each line into a sentence.
	pub fn from_lines<I, S>(lines: I, normalizer: &Normalizer) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let sentences = lines
			.into_iter()
			.map(|line| normalizer.normalize(line.as_ref()))
			.collect();
		Self { name: None, sentences }
	}

	/// Reads and normalizes a corpus file, one sentence per line.
	///
	/// # Errors
	/// Returns [`LmError::Io`] with the offending path if the file cannot be
	/// read as UTF-8.
	pub fn load<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> Result<Self> {
		let lines = read_file(&path)?;
		let mut corpus = Self::from_lines(&lines, normalizer);
		corpus.name = get_filename(&path);
		debug!(
			"loaded {} sentences ({} tokens) from {}",
			corpus.len(),
			corpus.token_count(),
			path.as_ref().display()
		);
		Ok(corpus)
	}

	/// Name derived from the source file, if any.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Attaches a display name.
	#[must_use]
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Number of sentences, blank ones included.
	pub fn len(&self) -> usize {
		self.sentences.len()
	}

	/// Returns `true` if the corpus has no sentence at all.
	pub fn is_empty(&self) -> bool {
		self.sentences.is_empty()
	}

	/// Total number of tokens over all sentences.
	pub fn token_count(&self) -> usize {
		self.sentences.iter().map(Vec::len).sum()
	}

	pub fn sentences(&self) -> &[Sentence] {
		&self.sentences
	}

	pub fn iter(&self) -> impl Iterator<Item = &Sentence> {
		self.sentences.iter()
	}

	/// Splits off a held-out part for evaluation.
	///
	/// Sentence indices are shuffled with a seeded RNG, so the same seed always
	/// yields the same split. Within each part the original order is kept.
	///
	/// # Errors
	/// Returns [`LmError::InvalidConfig`] unless `0.0 < holdout_ratio < 1.0`
	/// and both parts keep at least one sentence.
	pub fn split(&self, holdout_ratio: f64, seed: u64) -> Result<(Corpus, Corpus)> {
		if !(holdout_ratio > 0.0 && holdout_ratio < 1.0) {
			return Err(LmError::InvalidConfig(format!(
				"holdout ratio must be in (0, 1), got {holdout_ratio}"
			)));
		}

		let held_out_len = (self.len() as f64 * holdout_ratio).round() as usize;
		if held_out_len == 0 || held_out_len == self.len() {
			return Err(LmError::InvalidConfig(format!(
				"holdout ratio {holdout_ratio} leaves an empty part when splitting {} sentences",
				self.len()
			)));
		}

		let mut indices: Vec<usize> = (0..self.len()).collect();
		indices.shuffle(&mut StdRng::seed_from_u64(seed));
		let mut held_out_indices = indices.split_off(self.len() - held_out_len);
		indices.sort_unstable();
		held_out_indices.sort_unstable();

		let pick = |ids: &[usize], suffix: &str| Corpus {
			name: self.name.as_ref().map(|name| format!("{name}{suffix}")),
			sentences: ids.iter().map(|&i| self.sentences[i].clone()).collect(),
		};
		Ok((pick(&indices, ""), pick(&held_out_indices, ".heldout")))
	}
}

impl<'a> IntoIterator for &'a Corpus {
	type Item = &'a Sentence;
	type IntoIter = std::slice::Iter<'a, Sentence>;

	fn into_iter(self) -> Self::IntoIter {
		self.sentences.iter()
	}
}
