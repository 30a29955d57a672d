//! Sentence and corpus perplexity.
//!
//! Sentence probabilities are accumulated in log space:
//! `perplexity = exp(-(1/N) * Σ ln P(token_i | context_i))`, which equals the
//! inverse N-th root of the probability product but does not underflow on
//! long sentences.

use log::debug;
use serde::Serialize;

use super::ngram_model::NGramModel;
use super::parallel::fork_join;
use super::smoothing::Smoothing;
use super::{Order, transitions};
use crate::config::LmConfig;
use crate::corpus::{Corpus, Token};
use crate::error::{LmError, Result};

/// Perplexity of one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentenceScore {
	index: usize,
	tokens: usize,
	log_probability: f64,
	perplexity: f64,
}

impl SentenceScore {
	/// Position of the sentence in its corpus.
	pub fn index(&self) -> usize {
		self.index
	}

	pub fn tokens(&self) -> usize {
		self.tokens
	}

	/// Natural log of the sentence probability.
	pub fn log_probability(&self) -> f64 {
		self.log_probability
	}

	pub fn perplexity(&self) -> f64 {
		self.perplexity
	}
}

/// Perplexity of a model over a whole corpus.
///
/// # Invariants
/// - `sentences` is in corpus order and holds only scored sentences
/// - `mean` is the arithmetic mean of their perplexities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusPerplexity {
	order: Order,
	smoothing: Smoothing,
	mean: f64,
	skipped: usize,
	#[serde(skip)]
	sentences: Vec<SentenceScore>,
}

impl CorpusPerplexity {
	pub fn order(&self) -> Order {
		self.order
	}

	/// Estimator of the scored model.
	pub fn smoothing(&self) -> Smoothing {
		self.smoothing
	}

	/// Arithmetic mean of the per-sentence perplexities.
	pub fn mean(&self) -> f64 {
		self.mean
	}

	pub fn sentences(&self) -> &[SentenceScore] {
		&self.sentences
	}

	/// Number of sentences that contributed to the mean.
	pub fn scored(&self) -> usize {
		self.sentences.len()
	}

	/// Number of zero-length sentences left out.
	pub fn skipped(&self) -> usize {
		self.skipped
	}

	/// Tokens over all scored sentences.
	pub fn token_count(&self) -> usize {
		self.sentences.iter().map(SentenceScore::tokens).sum()
	}
}

/// Scores one sentence.
///
/// # Errors
/// - [`LmError::DegenerateSentence`] for a zero-length sentence
/// - [`LmError::UnknownToken`] / [`LmError::ZeroProbability`] from the model
/// - [`LmError::NonFinitePerplexity`] if the result is NaN or infinite
pub fn score_sentence(model: &NGramModel, index: usize, sentence: &[Token]) -> Result<SentenceScore> {
	if sentence.is_empty() {
		return Err(LmError::DegenerateSentence { index });
	}

	let ids = model.vocabulary().encode(sentence)?;
	let mut log_probability = 0.0;
	for (context, token) in transitions(model.order(), &ids) {
		log_probability += model.probability(context, token)?.ln();
	}

	let tokens = ids.len();
	let perplexity = (-log_probability / tokens as f64).exp();
	if !perplexity.is_finite() {
		return Err(LmError::NonFinitePerplexity { order: model.order(), sentence: Some(index) });
	}
	Ok(SentenceScore { index, tokens, log_probability, perplexity })
}

/// Scores every sentence of `corpus` and averages the perplexities.
///
/// Sentences are scored in parallel chunks. Zero-length sentences are
/// skipped and excluded from the mean; any other failure aborts.
///
/// # Errors
/// Returns [`LmError::EmptyCorpus`] if no sentence could be scored.
pub fn score_corpus(model: &NGramModel, corpus: &Corpus, cfg: &LmConfig) -> Result<CorpusPerplexity> {
	let chunks = fork_join(corpus.sentences(), cfg, |offset, sentences| -> Result<(Vec<SentenceScore>, usize)> {
		let mut scores = Vec::with_capacity(sentences.len());
		let mut skipped = 0;
		for (i, sentence) in sentences.iter().enumerate() {
			match score_sentence(model, offset + i, sentence) {
				Ok(score) => scores.push(score),
				Err(LmError::DegenerateSentence { index }) => {
					debug!("skipping empty sentence {index}");
					skipped += 1;
				}
				Err(err) => return Err(err),
			}
		}
		Ok((scores, skipped))
	});

	let mut sentences = Vec::with_capacity(corpus.len());
	let mut skipped = 0;
	for chunk in chunks {
		let (scores, chunk_skipped) = chunk?;
		sentences.extend(scores);
		skipped += chunk_skipped;
	}
	if sentences.is_empty() {
		return Err(LmError::EmptyCorpus);
	}

	let mean = sentences.iter().map(SentenceScore::perplexity).sum::<f64>() / sentences.len() as f64;
	if !mean.is_finite() {
		return Err(LmError::NonFinitePerplexity { order: model.order(), sentence: None });
	}
	Ok(CorpusPerplexity { order: model.order(), smoothing: model.smoothing(), mean, skipped, sentences })
}
