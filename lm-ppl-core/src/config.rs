//! Configuration controlling model fitting and scoring.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LmError, Result};
use crate::model::{OovPolicy, Order, Smoothing};

/// Largest accepted `chunk_factor`.
pub const MAX_CHUNK_FACTOR: usize = 1024;

/// Settings shared by the vocabulary builder, the count matrix, the scorer
/// and the comparator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LmConfig {
	/// N-gram orders compared by the comparator.
	pub orders: Vec<usize>,
	/// How tokens absent from the fitted vocabulary are resolved.
	pub oov_policy: OovPolicy,
	/// Estimator used by unigram models.
	pub unigram_smoothing: Smoothing,
	/// Estimator used by bigram and trigram models.
	pub ngram_smoothing: Smoothing,
	/// Largest number of cells a dense bigram table may allocate before
	/// falling back to sparse rows.
	pub dense_cell_limit: usize,
	/// Worker threads for counting and scoring; `None` uses every core.
	pub threads: Option<usize>,
	/// Number of chunks handed to each worker.
	pub chunk_factor: usize,
}

impl Default for LmConfig {
	fn default() -> Self {
		Self {
			orders: vec![1, 2, 3],
			oov_policy: OovPolicy::Reject,
			unigram_smoothing: Smoothing::Unsmoothed,
			ngram_smoothing: Smoothing::Laplace,
			dense_cell_limit: 1 << 22,
			threads: None,
			chunk_factor: 8,
		}
	}
}

impl LmConfig {
	/// Returns a builder initialised with [`LmConfig::default`].
	#[must_use]
	pub fn builder() -> LmConfigBuilder {
		LmConfigBuilder::default()
	}

	/// Reads a JSON configuration file. Missing fields take their default value.
	pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).map_err(|err| LmError::io(err, Some(path.to_path_buf())))?;
		let cfg: Self = serde_json::from_slice(&bytes)?;
		cfg.validate()?;
		Ok(cfg)
	}

	/// Validates the configured orders and returns them as [`Order`]s, in the
	/// order they were requested.
	pub fn parsed_orders(&self) -> Result<Vec<Order>> {
		if self.orders.is_empty() {
			return Err(LmError::InvalidConfig("at least one order must be requested".into()));
		}
		let mut seen = HashSet::new();
		let mut orders = Vec::with_capacity(self.orders.len());
		for &n in &self.orders {
			let order = Order::try_from(n)?;
			if !seen.insert(order) {
				return Err(LmError::InvalidConfig(format!("order {n} requested twice")));
			}
			orders.push(order);
		}
		Ok(orders)
	}

	/// Smoothing applied to a model of the given order.
	pub fn smoothing_for(&self, order: Order) -> Smoothing {
		match order {
			Order::Unigram => self.unigram_smoothing,
			Order::Bigram | Order::Trigram => self.ngram_smoothing,
		}
	}

	/// Number of worker threads to fork.
	pub fn workers(&self) -> usize {
		self.threads.unwrap_or_else(num_cpus::get).max(1)
	}

	/// Validates the invariants required before any corpus pass.
	pub fn validate(&self) -> Result<()> {
		self.parsed_orders()?;
		if self.threads == Some(0) {
			return Err(LmError::InvalidConfig("threads must be greater than zero".into()));
		}
		if self.chunk_factor == 0 {
			return Err(LmError::InvalidConfig("chunk_factor must be greater than zero".into()));
		}
		if self.chunk_factor > MAX_CHUNK_FACTOR {
			return Err(LmError::InvalidConfig(format!(
				"chunk_factor must be at most {MAX_CHUNK_FACTOR}, got {}",
				self.chunk_factor
			)));
		}
		if self.dense_cell_limit == 0 {
			return Err(LmError::InvalidConfig(
				"dense_cell_limit must be greater than zero".into(),
			));
		}
		Ok(())
	}
}

/// Builder for [`LmConfig`].
#[derive(Debug, Default, Clone)]
pub struct LmConfigBuilder {
	cfg: LmConfig,
}

impl LmConfigBuilder {
	/// Sets the orders to compare.
	#[must_use]
	pub fn orders<I>(mut self, orders: I) -> Self
	where
		I: IntoIterator<Item = usize>,
	{
		self.cfg.orders = orders.into_iter().collect();
		self
	}

	/// Sets the out-of-vocabulary policy.
	#[must_use]
	pub fn oov_policy(mut self, value: OovPolicy) -> Self {
		self.cfg.oov_policy = value;
		self
	}

	/// Sets the unigram estimator.
	#[must_use]
	pub fn unigram_smoothing(mut self, value: Smoothing) -> Self {
		self.cfg.unigram_smoothing = value;
		self
	}

	/// Sets the bigram/trigram estimator.
	#[must_use]
	pub fn ngram_smoothing(mut self, value: Smoothing) -> Self {
		self.cfg.ngram_smoothing = value;
		self
	}

	/// Caps the size of dense bigram tables.
	#[must_use]
	pub fn dense_cell_limit(mut self, value: usize) -> Self {
		self.cfg.dense_cell_limit = value;
		self
	}

	/// Pins the number of worker threads.
	#[must_use]
	pub fn threads(mut self, value: usize) -> Self {
		self.cfg.threads = Some(value);
		self
	}

	/// Sets how many chunks each worker receives.
	#[must_use]
	pub fn chunk_factor(mut self, value: usize) -> Self {
		self.cfg.chunk_factor = value;
		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<LmConfig> {
		self.cfg.validate()?;
		Ok(self.cfg)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_valid() {
		let cfg = LmConfig::default();
		cfg.validate().expect("defaults validate");
		assert_eq!(
			cfg.parsed_orders().expect("orders"),
			vec![Order::Unigram, Order::Bigram, Order::Trigram]
		);
		assert_eq!(cfg.smoothing_for(Order::Unigram), Smoothing::Unsmoothed);
		assert_eq!(cfg.smoothing_for(Order::Trigram), Smoothing::Laplace);
	}

	#[test]
	fn unsupported_order_is_rejected() {
		let err = LmConfig::builder().orders([2, 4]).build().unwrap_err();
		assert!(matches!(err, LmError::InvalidOrder(4)));
		let err = LmConfig::builder().orders([0]).build().unwrap_err();
		assert!(matches!(err, LmError::InvalidOrder(0)));
	}

	#[test]
	fn duplicate_and_empty_orders_are_rejected() {
		assert!(matches!(
			LmConfig::builder().orders([2, 2]).build(),
			Err(LmError::InvalidConfig(_))
		));
		assert!(matches!(
			LmConfig::builder().orders(Vec::new()).build(),
			Err(LmError::InvalidConfig(_))
		));
	}

	#[test]
	fn zero_threads_is_rejected() {
		assert!(matches!(
			LmConfig::builder().threads(0).build(),
			Err(LmError::InvalidConfig(_))
		));
	}

	#[test]
	fn chunk_factor_is_capped() {
		assert!(LmConfig::builder().chunk_factor(MAX_CHUNK_FACTOR).build().is_ok());
		let err = LmConfig::builder().threads(2).chunk_factor(1 << 40).build().unwrap_err();
		assert!(err.to_string().contains("chunk_factor must be at most"), "{err}");
	}

	#[test]
	fn json_file_fills_missing_fields() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("lm.json");
		std::fs::write(&path, r#"{"orders":[2],"oov_policy":"bucket","threads":2}"#)
			.expect("write config");
		let cfg = LmConfig::from_json_file(&path).expect("load config");
		assert_eq!(cfg.orders, vec![2]);
		assert_eq!(cfg.oov_policy, OovPolicy::Bucket);
		assert_eq!(cfg.threads, Some(2));
		assert_eq!(cfg.chunk_factor, LmConfig::default().chunk_factor);
	}
}
