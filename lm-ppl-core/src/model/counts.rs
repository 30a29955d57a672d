use std::collections::HashMap;

use log::debug;

use super::parallel::fork_join;
use super::state::State;
use super::vocabulary::{TokenId, Vocabulary};
use super::{Context, Order, Prev, transitions};
use crate::config::LmConfig;
use crate::corpus::Corpus;
use crate::error::{LmError, Result};

/// Transition counts of a bigram or trigram model.
///
/// The matrix is indexed by the ids of the vocabulary it was accumulated
/// against and is read-only once [`CountMatrix::accumulate`] returns.
///
/// # Storage
/// - `Dense`: a `(support + 1) × support` table for bigrams, the extra row
///   holding sentence-start transitions
/// - `Sparse`: a context → row mapping, used for trigrams and for bigram
///   vocabularies too large for a dense table
///
/// # Invariants
/// - Every cell is `>= 0` and every row total equals the sum of its cells
/// - All next-token ids are `< support`
#[derive(Debug, Clone, PartialEq)]
pub enum CountMatrix {
	Dense(DenseCounts),
	Sparse(SparseCounts),
}

/// Dense bigram table.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseCounts {
	support: usize,
	cells: Vec<u64>,
	row_totals: Vec<u64>,
}

/// Sparse rows keyed by context.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseCounts {
	order: Order,
	support: usize,
	rows: HashMap<Context, State>,
}

impl DenseCounts {
	fn new(support: usize) -> Self {
		Self {
			support,
			cells: vec![0; (support + 1) * support],
			row_totals: vec![0; support + 1],
		}
	}

	/// Row index of a bigram context; the start row comes last.
	fn row(&self, context: Context) -> Option<usize> {
		match context {
			Context::Bigram(Prev::Start) => Some(self.support),
			Context::Bigram(Prev::Token(id)) if (id as usize) < self.support => Some(id as usize),
			_ => None,
		}
	}

	fn add(&mut self, context: Context, next: TokenId, occurrences: u64) -> Result<()> {
		let row = self.row(context).filter(|_| (next as usize) < self.support).ok_or_else(|| {
			LmError::Internal(format!("transition {context:?} -> {next} outside the dense table"))
		})?;
		self.cells[row * self.support + next as usize] += occurrences;
		self.row_totals[row] += occurrences;
		Ok(())
	}

	fn count(&self, context: Context, next: TokenId) -> u64 {
		match self.row(context) {
			Some(row) if (next as usize) < self.support => self.cells[row * self.support + next as usize],
			_ => 0,
		}
	}

	fn context_total(&self, context: Context) -> u64 {
		self.row(context).map_or(0, |row| self.row_totals[row])
	}

	fn entries(&self) -> impl Iterator<Item = (Context, TokenId, u64)> + '_ {
		let support = self.support;
		self.cells
			.iter()
			.enumerate()
			.filter(|(_, count)| **count > 0)
			.map(move |(cell, &count)| {
				let (row, next) = (cell / support, cell % support);
				let prev = if row == support { Prev::Start } else { Prev::Token(row as TokenId) };
				(Context::Bigram(prev), next as TokenId, count)
			})
	}
}

impl SparseCounts {
	fn new(order: Order, support: usize) -> Self {
		Self { order, support, rows: HashMap::new() }
	}

	fn add(&mut self, context: Context, next: TokenId, occurrences: u64) -> Result<()> {
		if context.order() != self.order || next as usize >= self.support {
			return Err(LmError::Internal(format!(
				"transition {context:?} -> {next} does not fit a {} matrix",
				self.order
			)));
		}
		self.rows.entry(context).or_default().add_occurrences(next, occurrences);
		Ok(())
	}

	fn merge_rows(&mut self, other: &SparseCounts) {
		for (context, state) in &other.rows {
			self.rows.entry(*context).or_default().merge(state);
		}
	}
}

impl CountMatrix {
	/// Counts the transitions of `corpus` for a model of `order`.
	///
	/// Returns `None` for unigram models, whose counts are the vocabulary
	/// frequencies. Sentences are counted in parallel chunks against the
	/// frozen vocabulary; partial sparse matrices are then summed into the
	/// final storage.
	///
	/// # Errors
	/// Returns [`LmError::UnknownToken`] if `corpus` holds a token the
	/// vocabulary rejects.
	pub fn accumulate(
		order: Order,
		corpus: &Corpus,
		vocabulary: &Vocabulary,
		cfg: &LmConfig,
	) -> Result<Option<CountMatrix>> {
		if order == Order::Unigram {
			return Ok(None);
		}
		let support = vocabulary.support_size();

		let partials = fork_join(corpus.sentences(), cfg, |_, sentences| -> Result<SparseCounts> {
			let mut partial = SparseCounts::new(order, support);
			for sentence in sentences {
				let ids = vocabulary.encode(sentence)?;
				for (context, next) in transitions(order, &ids) {
					partial.rows.entry(context).or_default().add_transition(next);
				}
			}
			Ok(partial)
		});

		let mut matrix = CountMatrix::empty(order, support, cfg);
		for partial in partials {
			matrix.merge(&CountMatrix::Sparse(partial?))?;
		}
		debug!(
			"{order} counts: {} transitions over {} contexts ({} storage)",
			matrix.total_transitions(),
			matrix.observed_contexts(),
			if matrix.is_dense() { "dense" } else { "sparse" }
		);
		Ok(Some(matrix))
	}

	/// Empty matrix with the storage `cfg` allows for this order and support.
	pub(crate) fn empty(order: Order, support: usize, cfg: &LmConfig) -> Self {
		let dense_cells = support.checked_add(1).and_then(|rows| rows.checked_mul(support));
		match dense_cells {
			Some(cells) if order == Order::Bigram && cells <= cfg.dense_cell_limit => {
				CountMatrix::Dense(DenseCounts::new(support))
			}
			_ => CountMatrix::Sparse(SparseCounts::new(order, support)),
		}
	}

	pub fn order(&self) -> Order {
		match self {
			CountMatrix::Dense(_) => Order::Bigram,
			CountMatrix::Sparse(sparse) => sparse.order,
		}
	}

	/// Number of possible next tokens (vocabulary support size).
	pub fn support(&self) -> usize {
		match self {
			CountMatrix::Dense(dense) => dense.support,
			CountMatrix::Sparse(sparse) => sparse.support,
		}
	}

	pub fn is_dense(&self) -> bool {
		matches!(self, CountMatrix::Dense(_))
	}

	/// Observed transitions from `context` to `next`.
	pub fn count(&self, context: Context, next: TokenId) -> u64 {
		match self {
			CountMatrix::Dense(dense) => dense.count(context, next),
			CountMatrix::Sparse(sparse) => sparse.rows.get(&context).map_or(0, |row| row.count(next)),
		}
	}

	/// Observed transitions out of `context`.
	pub fn context_total(&self, context: Context) -> u64 {
		match self {
			CountMatrix::Dense(dense) => dense.context_total(context),
			CountMatrix::Sparse(sparse) => sparse.rows.get(&context).map_or(0, State::total),
		}
	}

	/// Sum of all cells.
	pub fn total_transitions(&self) -> u64 {
		match self {
			CountMatrix::Dense(dense) => dense.row_totals.iter().sum(),
			CountMatrix::Sparse(sparse) => sparse.rows.values().map(State::total).sum(),
		}
	}

	/// Number of contexts with at least one observed transition.
	pub fn observed_contexts(&self) -> usize {
		match self {
			CountMatrix::Dense(dense) => dense.row_totals.iter().filter(|total| **total > 0).count(),
			CountMatrix::Sparse(sparse) => sparse.rows.len(),
		}
	}

	/// Number of distinct `(context, next)` pairs observed.
	pub fn distinct_transitions(&self) -> usize {
		match self {
			CountMatrix::Dense(dense) => dense.cells.iter().filter(|count| **count > 0).count(),
			CountMatrix::Sparse(sparse) => sparse.rows.values().map(State::distinct).sum(),
		}
	}

	/// Adds the counts of `other` into this matrix.
	///
	/// # Errors
	/// Returns an error if the orders or supports differ.
	pub fn merge(&mut self, other: &CountMatrix) -> Result<()> {
		if self.order() != other.order() || self.support() != other.support() {
			return Err(LmError::Internal(format!(
				"cannot merge a {} matrix of support {} into a {} matrix of support {}",
				other.order(),
				other.support(),
				self.order(),
				self.support()
			)));
		}

		match (self, other) {
			(CountMatrix::Sparse(target), CountMatrix::Sparse(source)) => {
				target.merge_rows(source);
				Ok(())
			}
			(CountMatrix::Dense(target), CountMatrix::Dense(source)) => {
				for (cell, count) in target.cells.iter_mut().zip(&source.cells) {
					*cell += count;
				}
				for (total, count) in target.row_totals.iter_mut().zip(&source.row_totals) {
					*total += count;
				}
				Ok(())
			}
			(CountMatrix::Dense(target), CountMatrix::Sparse(source)) => {
				for (context, state) in &source.rows {
					for (next, count) in state.transitions() {
						target.add(*context, next, count)?;
					}
				}
				Ok(())
			}
			(CountMatrix::Sparse(target), CountMatrix::Dense(source)) => {
				for (context, next, count) in source.entries() {
					target.add(context, next, count)?;
				}
				Ok(())
			}
		}
	}
}
