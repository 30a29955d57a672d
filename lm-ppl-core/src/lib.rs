//! N-gram language models and perplexity scoring for code-mixed corpora.
//!
//! This crate provides:
//! - Line-oriented corpus loading with pluggable tokenization and stemming
//! - A frozen vocabulary assigning dense ids in first-seen order
//! - Unigram, bigram and trigram count matrices (dense or sparse)
//! - Add-one or unsmoothed probability estimates computed on demand
//! - Log-space sentence and corpus perplexity
//! - Side-by-side comparison of model orders
//!
//! ```no_run
//! use lm_ppl_core::{Comparator, Corpus, LmConfig, Normalizer};
//!
//! # fn main() -> lm_ppl_core::Result<()> {
//! let corpus = Corpus::load("tweets.txt", &Normalizer::default())?;
//! let comparison = Comparator::new(LmConfig::default()).compare(&corpus)?;
//! print!("{comparison}");
//! # Ok(())
//! # }
//! ```

/// Fitting, smoothing, scoring and comparison of n-gram models.
pub mod model;

/// Tokenizer and stemmer contracts plus their default implementations.
pub mod text;

/// In-memory corpus of normalized sentences.
pub mod corpus;

/// Shared configuration.
pub mod config;

/// Error taxonomy.
pub mod error;

/// I/O utilities (file loading, path helpers).
pub mod io;

pub use config::{LmConfig, LmConfigBuilder};
pub use corpus::{Corpus, Sentence, Token};
pub use error::{LmError, Result, Stage};
pub use model::{
	Comparator, Context, CorpusPerplexity, CountMatrix, ModelComparison, NGramModel, OovPolicy, Order, Prev,
	SentenceScore, Smoothing, TokenId, Vocabulary, VocabularyBuilder, compare_models, score_corpus,
	score_sentence,
};
pub use text::{IdentityStemmer, Normalizer, SnowballStemmer, Stemmer, Tokenizer, WhitespaceTokenizer, WordPunctTokenizer};
