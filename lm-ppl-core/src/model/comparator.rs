use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use super::ngram_model::NGramModel;
use super::perplexity::{CorpusPerplexity, score_corpus};
use super::vocabulary::Vocabulary;
use super::Order;
use crate::config::LmConfig;
use crate::corpus::Corpus;
use crate::error::{Result, Stage};

/// Fits one model per requested order and reports their perplexities side
/// by side.
///
/// # Behavior
/// - Orders are validated before the corpus is touched
/// - The vocabulary is built once and shared by every model
/// - Each order gets its own count matrix
///
/// No smoothing or order logic lives here.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
	cfg: LmConfig,
}

impl Comparator {
	pub fn new(cfg: LmConfig) -> Self {
		Self { cfg }
	}

	pub fn config(&self) -> &LmConfig {
		&self.cfg
	}

	/// Fits and scores on the same corpus.
	pub fn compare(&self, corpus: &Corpus) -> Result<ModelComparison> {
		self.run(corpus, corpus, false)
	}

	/// Fits on `train` and scores `evaluation`. Tokens of `evaluation`
	/// missing from `train` follow the configured out-of-vocabulary policy.
	pub fn compare_held_out(&self, train: &Corpus, evaluation: &Corpus) -> Result<ModelComparison> {
		self.run(train, evaluation, true)
	}

	fn run(&self, train: &Corpus, evaluation: &Corpus, held_out: bool) -> Result<ModelComparison> {
		self.cfg.validate()?;
		let orders = self.cfg.parsed_orders()?;

		let vocabulary = Vocabulary::build(train, self.cfg.oov_policy)
			.map(Arc::new)
			.map_err(|err| err.in_stage(Stage::Vocabulary))?;
		info!(
			"vocabulary: V={} over {} tokens in {} sentences",
			vocabulary.len(),
			vocabulary.total_tokens(),
			vocabulary.total_sentences()
		);

		let mut results = Vec::with_capacity(orders.len());
		for order in orders {
			let model = NGramModel::fit(order, train, Arc::clone(&vocabulary), &self.cfg)
				.map_err(|err| err.in_stage(Stage::Counting))?;
			let result = score_corpus(&model, evaluation, &self.cfg).map_err(|err| err.in_stage(Stage::Scoring))?;
			info!(
				"{order} perplexity {:.4} ({} sentences scored, {} skipped)",
				result.mean(),
				result.scored(),
				result.skipped()
			);
			results.push(result);
		}

		let comparison = ModelComparison {
			corpus: train.name().map(str::to_owned),
			evaluation: held_out.then(|| evaluation.name().map(str::to_owned)).flatten(),
			held_out,
			vocabulary_size: vocabulary.len(),
			total_tokens: vocabulary.total_tokens(),
			total_sentences: vocabulary.total_sentences(),
			asymmetric_smoothing: false,
			results,
		}
		.flag_asymmetry();
		if comparison.asymmetric_smoothing {
			warn!("orders use different smoothing; their perplexities are not directly comparable");
		}
		Ok(comparison)
	}
}

/// Fits and scores `orders` on `corpus` with the default configuration.
///
/// # Errors
/// Returns [`LmError::InvalidOrder`](crate::error::LmError::InvalidOrder)
/// before any pass if an order is outside 1..=3.
pub fn compare_models(corpus: &Corpus, orders: &[usize]) -> Result<ModelComparison> {
	let cfg = LmConfig::builder().orders(orders.iter().copied()).build()?;
	Comparator::new(cfg).compare(corpus)
}

/// Per-order corpus perplexities of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
	corpus: Option<String>,
	evaluation: Option<String>,
	held_out: bool,
	vocabulary_size: usize,
	total_tokens: u64,
	total_sentences: usize,
	asymmetric_smoothing: bool,
	results: Vec<CorpusPerplexity>,
}

impl ModelComparison {
	fn flag_asymmetry(mut self) -> Self {
		self.asymmetric_smoothing = self
			.results
			.windows(2)
			.any(|pair| pair[0].smoothing() != pair[1].smoothing());
		self
	}

	/// Results in the order they were requested.
	pub fn results(&self) -> &[CorpusPerplexity] {
		&self.results
	}

	pub fn get(&self, order: Order) -> Option<&CorpusPerplexity> {
		self.results.iter().find(|result| result.order() == order)
	}

	/// Order with the lowest perplexity.
	pub fn best(&self) -> Option<&CorpusPerplexity> {
		self.results.iter().min_by(|a, b| a.mean().total_cmp(&b.mean()))
	}

	/// `true` when the compared models do not share one estimator, e.g. the
	/// default unsmoothed unigram next to add-one bigram and trigram.
	pub fn is_asymmetric(&self) -> bool {
		self.asymmetric_smoothing
	}

	pub fn is_held_out(&self) -> bool {
		self.held_out
	}

	/// Distinct tokens of the training corpus.
	pub fn vocabulary_size(&self) -> usize {
		self.vocabulary_size
	}

	pub fn total_tokens(&self) -> u64 {
		self.total_tokens
	}

	pub fn total_sentences(&self) -> usize {
		self.total_sentences
	}
}

impl fmt::Display for ModelComparison {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(corpus) = &self.corpus {
			write!(f, "corpus: {corpus}")?;
			if let Some(evaluation) = &self.evaluation {
				write!(f, " (evaluated on {evaluation})")?;
			}
			writeln!(f)?;
		}
		writeln!(
			f,
			"V = {}, tokens = {}, sentences = {}",
			self.vocabulary_size, self.total_tokens, self.total_sentences
		)?;
		writeln!(f, "{:<8}  {:<10}  {:>12}  {:>7}  {:>7}", "order", "smoothing", "perplexity", "scored", "skipped")?;
		for result in &self.results {
			writeln!(
				f,
				"{:<8}  {:<10}  {:>12.4}  {:>7}  {:>7}",
				result.order().to_string(),
				result.smoothing().to_string(),
				result.mean(),
				result.scored(),
				result.skipped()
			)?;
		}
		if let Some(best) = self.best() {
			writeln!(f, "best: {}", best.order())?;
		}
		if self.asymmetric_smoothing {
			writeln!(f, "note: orders use different smoothing, perplexities are not directly comparable")?;
		}
		Ok(())
	}
}
