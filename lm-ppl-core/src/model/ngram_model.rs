use std::sync::Arc;

use log::info;

use super::counts::CountMatrix;
use super::smoothing::Smoothing;
use super::vocabulary::{TokenId, Vocabulary};
use super::{Context, Order};
use crate::config::LmConfig;
use crate::corpus::Corpus;
use crate::error::{LmError, Result};

/// A fitted n-gram model over a shared vocabulary.
///
/// The `NGramModel` pairs the frozen vocabulary with the transition counts
/// of one order and an estimator. Probabilities are computed on demand and
/// never stored.
///
/// # Responsibilities
/// - Fit counts for one order against a given vocabulary
/// - Estimate `P(token | context)` with the configured smoothing
/// - Re-smooth without recounting
///
/// # Invariants
/// - `counts` is `None` exactly when `order` is unigram
/// - `counts` was accumulated against `vocabulary` (same support size)
#[derive(Clone, Debug)]
pub struct NGramModel {
	order: Order,
	vocabulary: Arc<Vocabulary>,
	counts: Option<CountMatrix>,
	smoothing: Smoothing,
}

impl NGramModel {
	/// Fits a model of `order` on `corpus`.
	///
	/// The smoothing comes from `cfg` ([`LmConfig::smoothing_for`]).
	///
	/// # Errors
	/// Propagates counting errors, e.g. [`LmError::UnknownToken`] when
	/// `corpus` holds tokens the vocabulary rejects.
	pub fn fit(order: Order, corpus: &Corpus, vocabulary: Arc<Vocabulary>, cfg: &LmConfig) -> Result<Self> {
		let counts = CountMatrix::accumulate(order, corpus, &vocabulary, cfg)?;
		let model = Self::from_parts(order, vocabulary, counts, cfg.smoothing_for(order))?;
		info!(
			"fitted {order} model: V={}, {} contexts, {} smoothing",
			model.vocabulary.len(),
			model.counts.as_ref().map_or(1, CountMatrix::observed_contexts),
			model.smoothing
		);
		Ok(model)
	}

	/// Assembles a model from precomputed parts.
	///
	/// # Errors
	/// Returns [`LmError::Internal`] if the counts do not belong to `order`
	/// or were accumulated against a vocabulary of a different size.
	pub fn from_parts(
		order: Order,
		vocabulary: Arc<Vocabulary>,
		counts: Option<CountMatrix>,
		smoothing: Smoothing,
	) -> Result<Self> {
		match (&counts, order) {
			(None, Order::Unigram) => {}
			(Some(matrix), order) if matrix.order() == order => {
				if matrix.support() != vocabulary.support_size() {
					return Err(LmError::Internal(format!(
						"count matrix support {} does not match vocabulary support {}",
						matrix.support(),
						vocabulary.support_size()
					)));
				}
			}
			_ => {
				return Err(LmError::Internal(format!("counts do not match a {order} model")));
			}
		}
		Ok(Self { order, vocabulary, counts, smoothing })
	}

	/// Same counts, different estimator.
	#[must_use]
	pub fn with_smoothing(mut self, smoothing: Smoothing) -> Self {
		self.smoothing = smoothing;
		self
	}

	pub fn order(&self) -> Order {
		self.order
	}

	pub fn smoothing(&self) -> Smoothing {
		self.smoothing
	}

	pub fn vocabulary(&self) -> &Arc<Vocabulary> {
		&self.vocabulary
	}

	/// Transition counts; `None` for unigram models.
	pub fn counts(&self) -> Option<&CountMatrix> {
		self.counts.as_ref()
	}

	/// `P(token | context)`, always in `(0, 1]`.
	///
	/// For unigram models the context must be [`Context::Empty`] and the
	/// estimate is `count(token) / total_tokens` (or its add-one variant).
	///
	/// # Errors
	/// - [`LmError::UnknownToken`] if a unigram outcome has no mass
	/// - [`LmError::ZeroProbability`] for an unseen transition under
	///   [`Smoothing::Unsmoothed`]
	pub fn probability(&self, context: Context, token: TokenId) -> Result<f64> {
		if context.order() != self.order {
			return Err(LmError::Internal(format!(
				"{} context passed to a {} model",
				context.order(),
				self.order
			)));
		}
		let support = self.vocabulary.support_size();
		if token as usize >= support {
			return Err(LmError::Internal(format!("token id {token} outside support of size {support}")));
		}

		match &self.counts {
			None => self
				.smoothing
				.estimate(self.vocabulary.count(token), self.vocabulary.total_tokens(), support)
				.ok_or_else(|| LmError::UnknownToken { token: self.token_name(token) }),
			Some(counts) => self
				.smoothing
				.estimate(counts.count(context, token), counts.context_total(context), support)
				.ok_or_else(|| LmError::ZeroProbability {
					order: self.order,
					context: context.describe(&self.vocabulary),
					token: self.token_name(token),
				}),
		}
	}

	/// `P(token | history)` for normalized token strings.
	///
	/// Only the last `n - 1` history tokens are used; a shorter history is
	/// treated as the beginning of a sentence.
	///
	/// # Errors
	/// Fails like [`NGramModel::probability`], and with
	/// [`LmError::UnknownToken`] when a token cannot be resolved.
	pub fn conditional(&self, history: &[&str], token: &str) -> Result<f64> {
		let keep = self.order.n() - 1;
		let mut ids = history[history.len().saturating_sub(keep)..]
			.iter()
			.map(|word| self.vocabulary.resolve(word))
			.collect::<Result<Vec<_>>>()?;
		ids.push(self.vocabulary.resolve(token)?);
		let position = ids.len() - 1;
		self.probability(Context::at(self.order, &ids, position), ids[position])
	}

	fn token_name(&self, token: TokenId) -> String {
		self.vocabulary.token(token).unwrap_or("<unk>").to_owned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{OovPolicy, Prev};
	use crate::text::Normalizer;

	fn fit(lines: &[&str], order: Order, cfg: &LmConfig) -> NGramModel {
		let corpus = Corpus::from_lines(lines, &Normalizer::unstemmed());
		let vocab = Arc::new(Vocabulary::build(&corpus, cfg.oov_policy).expect("vocabulary"));
		NGramModel::fit(order, &corpus, vocab, cfg).expect("fit")
	}

	#[test]
	fn bigram_probability_of_cat_after_the_is_one_third() {
		let model = fit(&["the cat sat", "the dog sat"], Order::Bigram, &LmConfig::default());
		let p = model.conditional(&["the"], "cat").expect("probability");
		assert!((p - 1.0 / 3.0).abs() < 1e-12, "got {p}");
	}

	#[test]
	fn smoothed_rows_sum_to_one() {
		let model = fit(&["a b a c", "c b", "b b a"], Order::Bigram, &LmConfig::default());
		let vocab = model.vocabulary().clone();
		let mut contexts = vec![Context::Bigram(Prev::Start)];
		contexts.extend((0..vocab.len() as TokenId).map(|id| Context::Bigram(Prev::Token(id))));
		for context in contexts {
			let sum: f64 = (0..vocab.len() as TokenId)
				.map(|next| model.probability(context, next).expect("probability"))
				.sum();
			assert!((sum - 1.0).abs() < 1e-9, "{context:?} sums to {sum}");
		}
	}

	#[test]
	fn bucketed_rows_sum_to_one_over_the_support() {
		let cfg = LmConfig::builder().oov_policy(OovPolicy::Bucket).build().expect("config");
		let model = fit(&["a b a c", "c b"], Order::Trigram, &cfg);
		let support = model.vocabulary().support_size() as TokenId;
		let context = Context::Trigram(Prev::Token(0), Prev::Token(1));
		let sum: f64 = (0..support)
			.map(|next| model.probability(context, next).expect("probability"))
			.sum();
		assert!((sum - 1.0).abs() < 1e-9);
		assert!(model.conditional(&["a", "b"], "never-seen").expect("bucket") > 0.0);
	}

	#[test]
	fn token_ids_outside_the_support_are_rejected() {
		let model = fit(&["the cat sat", "the dog sat"], Order::Bigram, &LmConfig::default());
		let support = model.vocabulary().support_size() as TokenId;
		let err = model.probability(Context::Bigram(Prev::Start), support).unwrap_err();
		assert!(matches!(err, LmError::Internal(_)));

		let unigram = fit(&["the cat"], Order::Unigram, &LmConfig::default()).with_smoothing(Smoothing::Laplace);
		assert!(matches!(unigram.probability(Context::Empty, 2), Err(LmError::Internal(_))));
	}

	#[test]
	fn unigram_is_relative_frequency() {
		let model = fit(&["the cat sat", "the dog sat"], Order::Unigram, &LmConfig::default());
		assert!(model.counts().is_none());
		let p = model.conditional(&[], "the").expect("probability");
		assert!((p - 2.0 / 6.0).abs() < 1e-12);
		// History is ignored by unigram models.
		assert_eq!(model.conditional(&["cat"], "the").expect("probability"), p);
	}

	#[test]
	fn unigram_bucket_has_no_mass_without_smoothing() {
		let cfg = LmConfig::builder().oov_policy(OovPolicy::Bucket).build().expect("config");
		let model = fit(&["a b"], Order::Unigram, &cfg);
		let err = model.conditional(&[], "zzz").unwrap_err();
		assert!(matches!(err, LmError::UnknownToken { .. }));

		let smoothed = model.with_smoothing(Smoothing::Laplace);
		let p = smoothed.conditional(&[], "zzz").expect("smoothed bucket");
		assert!((p - 1.0 / 5.0).abs() < 1e-12);
	}

	#[test]
	fn unsmoothed_bigram_reports_zero_probability() {
		let model = fit(&["a b"], Order::Bigram, &LmConfig::default()).with_smoothing(Smoothing::Unsmoothed);
		assert_eq!(model.conditional(&["a"], "b").expect("seen"), 1.0);
		let err = model.conditional(&["b"], "a").unwrap_err();
		assert!(matches!(err, LmError::ZeroProbability { order: Order::Bigram, .. }));
	}

	#[test]
	fn reject_policy_surfaces_unknown_tokens() {
		let model = fit(&["a b"], Order::Bigram, &LmConfig::default());
		let err = model.conditional(&["a"], "zzz").unwrap_err();
		assert!(matches!(err, LmError::UnknownToken { ref token } if token == "zzz"));
	}

	#[test]
	fn mismatched_parts_are_rejected() {
		let corpus = Corpus::from_lines(["a b"], &Normalizer::unstemmed());
		let vocab = Arc::new(Vocabulary::build(&corpus, OovPolicy::Reject).expect("vocabulary"));
		let err = NGramModel::from_parts(Order::Bigram, vocab.clone(), None, Smoothing::Laplace).unwrap_err();
		assert!(matches!(err, LmError::Internal(_)));

		let other = CountMatrix::empty(Order::Bigram, 7, &LmConfig::default());
		let err = NGramModel::from_parts(Order::Bigram, vocab, Some(other), Smoothing::Laplace).unwrap_err();
		assert!(matches!(err, LmError::Internal(_)));
	}

	#[test]
	fn context_of_the_wrong_order_is_rejected() {
		let model = fit(&["a b"], Order::Bigram, &LmConfig::default());
		assert!(matches!(model.probability(Context::Empty, 0), Err(LmError::Internal(_))));
	}
}
