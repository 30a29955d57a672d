//! Tokenization and normalization of raw corpus lines.
//!
//! The models only depend on the [`Tokenizer`] and [`Stemmer`] contracts.
//! [`Normalizer`] glues one of each together and case-folds every token
//! before stemming, so that a `Token` is always a lower-cased stem.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer as SnowballAlgorithm};

/// Splits a raw line into raw tokens.
pub trait Tokenizer {
	/// Returns the raw tokens of `line`, in order.
	fn tokenize(&self, line: &str) -> Vec<String>;
}

/// Maps a case-folded token to its normalized form.
pub trait Stemmer {
	/// Returns the stem of `token`.
	fn stem(&self, token: &str) -> String;
}

static WORD_PUNCT: LazyLock<Regex> = LazyLock::new(|| {
	// Infallible: the pattern is a literal.
	Regex::new(r"\w+|[^\w\s]+").expect("valid word/punct pattern")
});

/// Splits a line into runs of word characters and runs of punctuation.
///
/// `"don't stop!!"` → `["don", "'", "t", "stop", "!!"]`
#[derive(Debug, Default, Clone, Copy)]
pub struct WordPunctTokenizer;

impl Tokenizer for WordPunctTokenizer {
	fn tokenize(&self, line: &str) -> Vec<String> {
		WORD_PUNCT.find_iter(line).map(|m| m.as_str().to_owned()).collect()
	}
}

/// Splits on Unicode whitespace only.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
	fn tokenize(&self, line: &str) -> Vec<String> {
		line.split_whitespace().map(str::to_owned).collect()
	}
}

/// Snowball (Porter family) English stemmer.
pub struct SnowballStemmer {
	inner: SnowballAlgorithm,
}

impl SnowballStemmer {
	/// English stemmer.
	pub fn english() -> Self {
		Self { inner: SnowballAlgorithm::create(Algorithm::English) }
	}
}

impl Default for SnowballStemmer {
	fn default() -> Self {
		Self::english()
	}
}

impl fmt::Debug for SnowballStemmer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SnowballStemmer")
	}
}

impl Stemmer for SnowballStemmer {
	fn stem(&self, token: &str) -> String {
		self.inner.stem(token).into_owned()
	}
}

/// Leaves tokens untouched (apart from the case folding done by [`Normalizer`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
	fn stem(&self, token: &str) -> String {
		token.to_owned()
	}
}

/// Turns raw lines into sequences of normalized tokens.
pub struct Normalizer {
	tokenizer: Box<dyn Tokenizer + Send + Sync>,
	stemmer: Box<dyn Stemmer + Send + Sync>,
}

impl Normalizer {
	/// Creates a normalizer from a tokenizer and a stemmer.
	pub fn new<T, S>(tokenizer: T, stemmer: S) -> Self
	where
		T: Tokenizer + Send + Sync + 'static,
		S: Stemmer + Send + Sync + 'static,
	{
		Self { tokenizer: Box::new(tokenizer), stemmer: Box::new(stemmer) }
	}

	/// Word/punctuation splitting with case folding only.
	pub fn unstemmed() -> Self {
		Self::new(WordPunctTokenizer, IdentityStemmer)
	}

	/// Tokenizes, case-folds and stems `line`. Tokens that normalize to an
	/// empty string are dropped.
	pub fn normalize(&self, line: &str) -> Vec<String> {
		self.tokenizer
			.tokenize(line)
			.into_iter()
			.map(|raw| self.stemmer.stem(&raw.to_lowercase()))
			.filter(|token| !token.is_empty())
			.collect()
	}
}

impl Default for Normalizer {
	fn default() -> Self {
		Self::new(WordPunctTokenizer, SnowballStemmer::english())
	}
}

impl fmt::Debug for Normalizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Normalizer").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn word_punct_splits_punctuation_runs() {
		let tokens = WordPunctTokenizer.tokenize("don't stop!! #yolo");
		assert_eq!(tokens, vec!["don", "'", "t", "stop", "!!", "#", "yolo"]);
	}

	#[test]
	fn word_punct_keeps_non_latin_words() {
		let tokens = WordPunctTokenizer.tokenize("kya baat hai, भाई");
		assert_eq!(tokens, vec!["kya", "baat", "hai", ",", "भाई"]);
	}

	#[test]
	fn whitespace_tokenizer_keeps_punctuation_attached() {
		assert_eq!(WhitespaceTokenizer.tokenize("  hi,  there "), vec!["hi,", "there"]);
	}

	#[test]
	fn default_normalizer_folds_case_and_stems() {
		let normalizer = Normalizer::default();
		assert_eq!(normalizer.normalize("Running CATS"), vec!["run", "cat"]);
	}

	#[test]
	fn unstemmed_normalizer_only_folds_case() {
		let normalizer = Normalizer::unstemmed();
		assert_eq!(normalizer.normalize("The Cats sat."), vec!["the", "cats", "sat", "."]);
		assert!(normalizer.normalize("   ").is_empty());
	}
}
