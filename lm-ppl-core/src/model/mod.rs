//! Top-level module for the n-gram language models.
//!
//! This module provides:
//! - A frozen, id-assigning vocabulary (`Vocabulary`)
//! - Dense and sparse transition counts (`CountMatrix`)
//! - Lazy probability estimation (`Smoothing`)
//! - Fitted models (`NGramModel`)
//! - Sentence and corpus perplexity (`perplexity`)
//! - Side-by-side comparison of model orders (`Comparator`)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LmError;

/// Distinct normalized tokens, each assigned a dense id in first-seen order.
///
/// Built once, then shared read-only between models.
pub mod vocabulary;

/// Transition counts indexed by vocabulary ids.
///
/// Dense tables for bigrams when feasible, sparse rows otherwise.
pub mod counts;

/// Outgoing transitions of a single context.
///
/// Used as the row type of sparse count matrices.
mod state;

/// Probability estimators applied lazily on top of raw counts.
pub mod smoothing;

/// Fitted n-gram model (`order` in 1..=3).
pub mod ngram_model;

/// Per-sentence and corpus-level perplexity.
pub mod perplexity;

/// Fits and scores several orders against one shared vocabulary.
pub mod comparator;

/// Fork-join helper used by the counting and scoring passes.
mod parallel;

pub use comparator::{Comparator, ModelComparison, compare_models};
pub use counts::CountMatrix;
pub use ngram_model::NGramModel;
pub use perplexity::{CorpusPerplexity, SentenceScore, score_corpus, score_sentence};
pub use smoothing::Smoothing;
pub use vocabulary::{OovPolicy, TokenId, Vocabulary, VocabularyBuilder};

/// Supported n-gram orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
	Unigram,
	Bigram,
	Trigram,
}

impl Order {
	/// Every supported order, lowest first.
	pub const ALL: [Order; 3] = [Order::Unigram, Order::Bigram, Order::Trigram];

	/// Number of tokens in one n-gram.
	pub fn n(self) -> usize {
		match self {
			Order::Unigram => 1,
			Order::Bigram => 2,
			Order::Trigram => 3,
		}
	}
}

impl TryFrom<usize> for Order {
	type Error = LmError;

	fn try_from(n: usize) -> Result<Self, Self::Error> {
		match n {
			1 => Ok(Order::Unigram),
			2 => Ok(Order::Bigram),
			3 => Ok(Order::Trigram),
			other => Err(LmError::InvalidOrder(other)),
		}
	}
}

impl fmt::Display for Order {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Order::Unigram => "unigram",
			Order::Bigram => "bigram",
			Order::Trigram => "trigram",
		};
		f.write_str(name)
	}
}

/// One slot of conditioning history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prev {
	/// Sentence-start marker (padding before the first token).
	Start,
	Token(TokenId),
}

/// Conditioning context of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Context {
	/// Unigram: no history.
	Empty,
	/// Bigram: previous token.
	Bigram(Prev),
	/// Trigram: the two previous tokens, oldest first.
	Trigram(Prev, Prev),
}

impl Context {
	/// Context of the token at `position` in `ids` for a model of `order`.
	/// Positions before the start of the sentence read as [`Prev::Start`].
	pub fn at(order: Order, ids: &[TokenId], position: usize) -> Self {
		let prev = |back: usize| match position.checked_sub(back) {
			Some(i) => Prev::Token(ids[i]),
			None => Prev::Start,
		};
		match order {
			Order::Unigram => Context::Empty,
			Order::Bigram => Context::Bigram(prev(1)),
			Order::Trigram => Context::Trigram(prev(2), prev(1)),
		}
	}

	/// Order of the model this context belongs to.
	pub fn order(self) -> Order {
		match self {
			Context::Empty => Order::Unigram,
			Context::Bigram(_) => Order::Bigram,
			Context::Trigram(..) => Order::Trigram,
		}
	}

	/// Renders the context with the tokens of `vocabulary`.
	pub fn describe(self, vocabulary: &Vocabulary) -> String {
		let slot = |prev: Prev| match prev {
			Prev::Start => "<s>".to_owned(),
			Prev::Token(id) => vocabulary.token(id).unwrap_or("<unk>").to_owned(),
		};
		match self {
			Context::Empty => "<empty>".to_owned(),
			Context::Bigram(p) => slot(p),
			Context::Trigram(p2, p1) => format!("{} {}", slot(p2), slot(p1)),
		}
	}
}

/// Iterates `(context, token)` pairs of an encoded sentence.
pub(crate) fn transitions(order: Order, ids: &[TokenId]) -> impl Iterator<Item = (Context, TokenId)> + '_ {
	ids.iter()
		.enumerate()
		.map(move |(position, &id)| (Context::at(order, ids, position), id))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn order_conversion() {
		assert_eq!(Order::try_from(2).expect("bigram"), Order::Bigram);
		assert!(matches!(Order::try_from(4), Err(LmError::InvalidOrder(4))));
		assert_eq!(Order::Trigram.n(), 3);
		assert_eq!(Order::Unigram.to_string(), "unigram");
	}

	#[test]
	fn contexts_are_padded_with_start() {
		let ids = [5, 6, 7];
		let trigram: Vec<_> = transitions(Order::Trigram, &ids).collect();
		assert_eq!(
			trigram,
			vec![
				(Context::Trigram(Prev::Start, Prev::Start), 5),
				(Context::Trigram(Prev::Start, Prev::Token(5)), 6),
				(Context::Trigram(Prev::Token(5), Prev::Token(6)), 7),
			]
		);
		assert_eq!(Context::at(Order::Bigram, &ids, 0), Context::Bigram(Prev::Start));
		assert_eq!(Context::at(Order::Unigram, &ids, 2), Context::Empty);
	}
}
