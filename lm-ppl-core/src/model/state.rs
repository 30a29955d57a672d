use std::collections::HashMap;

use super::vocabulary::TokenId;

/// Observed continuations of one context.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during counting
/// - Answer count and row-total queries
/// - Merge with the row of the same context from another partial matrix
///
/// ## Invariants
/// - Each stored transition count is strictly positive
/// - `total` equals the sum of all transition counts
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct State {
	/// Outgoing transitions indexed by the next token id.
	/// Example: { 4 => 42, 9 => 3 }
	transitions: HashMap<TokenId, u64>,
	total: u64,
}

impl State {
	/// Records one occurrence of a transition toward `next`.
	pub(crate) fn add_transition(&mut self, next: TokenId) {
		self.add_occurrences(next, 1);
	}

	/// Records `occurrences` transitions toward `next` at once.
	pub(crate) fn add_occurrences(&mut self, next: TokenId, occurrences: u64) {
		if occurrences == 0 {
			return;
		}
		*self.transitions.entry(next).or_insert(0) += occurrences;
		self.total += occurrences;
	}

	pub(crate) fn count(&self, next: TokenId) -> u64 {
		self.transitions.get(&next).copied().unwrap_or(0)
	}

	pub(crate) fn total(&self) -> u64 {
		self.total
	}

	/// Iterates `(next, count)` pairs in arbitrary order.
	pub(crate) fn transitions(&self) -> impl Iterator<Item = (TokenId, u64)> + '_ {
		self.transitions.iter().map(|(next, count)| (*next, *count))
	}

	/// Number of distinct continuations.
	pub(crate) fn distinct(&self) -> usize {
		self.transitions.len()
	}

	/// Sums the transitions of `other` into this row.
	///
	/// Both rows must belong to the same context; the caller guarantees it.
	pub(crate) fn merge(&mut self, other: &Self) {
		for (next, occurrence) in &other.transitions {
			*self.transitions.entry(*next).or_insert(0) += *occurrence;
		}
		self.total += other.total;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_tracks_transitions() {
		let mut state = State::default();
		state.add_transition(3);
		state.add_transition(3);
		state.add_transition(1);
		assert_eq!(state.count(3), 2);
		assert_eq!(state.count(7), 0);
		assert_eq!(state.total(), 3);
		assert_eq!(state.distinct(), 2);
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = State::default();
		left.add_transition(1);
		let mut right = State::default();
		right.add_transition(1);
		right.add_transition(2);
		left.merge(&right);
		assert_eq!(left.count(1), 2);
		assert_eq!(left.count(2), 1);
		assert_eq!(left.total(), 3);
	}
}
