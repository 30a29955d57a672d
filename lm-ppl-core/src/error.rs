//! Error taxonomy shared by every stage of the perplexity pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Order;

/// Convenient result type used throughout the crate.
pub type Result<T, E = LmError> = std::result::Result<T, E>;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
	/// Reading and normalizing the corpus file.
	Load,
	/// Building the vocabulary.
	Vocabulary,
	/// Accumulating transition counts.
	Counting,
	/// Scoring sentences.
	Scoring,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Stage::Load => "load",
			Stage::Vocabulary => "vocabulary",
			Stage::Counting => "counting",
			Stage::Scoring => "scoring",
		};
		f.write_str(name)
	}
}

/// Failures raised while fitting or scoring n-gram models.
///
/// Construction errors (vocabulary, counts) are fatal. `DegenerateSentence`
/// is recovered by the corpus scorer, every other variant aborts the run.
#[derive(Debug, Error)]
pub enum LmError {
	/// No token was observed, so no model can be fitted.
	#[error("corpus contains no tokens")]
	EmptyCorpus,

	/// Token absent from the fitted vocabulary under the `Reject` policy,
	/// or a unigram outcome with no observed mass.
	#[error("unknown token {token:?}")]
	UnknownToken {
		/// Normalized form of the offending token.
		token: String,
	},

	/// Sentence with zero tokens; it has no perplexity.
	#[error("sentence {index} has no tokens")]
	DegenerateSentence {
		/// Position of the sentence in its corpus.
		index: usize,
	},

	/// Requested n-gram order is not supported.
	#[error("unsupported n-gram order {0} (expected 1, 2 or 3)")]
	InvalidOrder(usize),

	/// Unsmoothed estimate for an unseen transition.
	#[error("{order} model assigns zero probability to {token:?} after {context}")]
	ZeroProbability {
		/// Order of the model that produced the estimate.
		order: Order,
		/// Human-readable context.
		context: String,
		/// Normalized token.
		token: String,
	},

	/// Perplexity evaluated to NaN or infinity.
	#[error("{order} perplexity is not finite{}", sentence_suffix(.sentence))]
	NonFinitePerplexity {
		/// Order of the model being scored.
		order: Order,
		/// Sentence index, `None` for the corpus mean.
		sentence: Option<usize>,
	},

	/// Configuration failed validation.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Filesystem IO error with optional context path.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		/// Underlying IO error.
		source: std::io::Error,
		/// Path associated with the failure if available.
		path: Option<PathBuf>,
	},

	/// Invariant violation that should not occur.
	#[error("internal error: {0}")]
	Internal(String),

	/// Failure tagged with the stage it happened in.
	#[error("{stage} stage failed: {source}")]
	Stage {
		/// Stage that failed.
		stage: Stage,
		/// Underlying failure.
		#[source]
		source: Box<LmError>,
	},
}

fn sentence_suffix(sentence: &Option<usize>) -> String {
	sentence.map(|i| format!(" for sentence {i}")).unwrap_or_default()
}

impl From<serde_json::Error> for LmError {
	fn from(err: serde_json::Error) -> Self {
		Self::InvalidConfig(err.to_string())
	}
}

impl LmError {
	/// Helper constructor that attaches an optional path when wrapping IO errors.
	pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
		Self::Io { source, path }
	}

	/// Tags the error with the stage it occurred in. Already tagged errors keep
	/// their innermost stage.
	pub fn in_stage(self, stage: Stage) -> Self {
		match self {
			tagged @ LmError::Stage { .. } => tagged,
			other => LmError::Stage { stage, source: Box::new(other) },
		}
	}

	/// Returns the stage tag, if any.
	pub fn stage(&self) -> Option<Stage> {
		match self {
			LmError::Stage { stage, .. } => Some(*stage),
			_ => None,
		}
	}

	/// Strips stage tags and returns the underlying failure.
	pub fn root(&self) -> &LmError {
		match self {
			LmError::Stage { source, .. } => source.root(),
			other => other,
		}
	}
}
