use std::sync::mpsc;
use std::thread;

use crate::config::LmConfig;

/// Splits `items` into chunks, runs `work` on each chunk in its own thread and
/// returns the results in chunk order.
///
/// - The number of chunks is `workers * chunk_factor` (bounded by the input size)
/// - Results travel back through an MPSC channel tagged with their chunk index
/// - A single chunk runs on the calling thread
pub(crate) fn fork_join<T, R, F>(items: &[T], cfg: &LmConfig, work: F) -> Vec<R>
where
	T: Sync,
	R: Send,
	F: Fn(usize, &[T]) -> R + Sync,
{
	if items.is_empty() {
		return Vec::new();
	}

	let chunks = cfg.workers().saturating_mul(cfg.chunk_factor.max(1)).min(items.len());
	let chunk_size = items.len().div_ceil(chunks);
	if chunk_size >= items.len() {
		return vec![work(0, items)];
	}

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for (index, chunk) in items.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let work = &work;
			scope.spawn(move || {
				// The receiver outlives the scope, so sending cannot fail.
				let _ = tx.send((index, work(index * chunk_size, chunk)));
			});
		}
	});
	drop(tx);

	let mut results: Vec<(usize, R)> = rx.iter().collect();
	results.sort_by_key(|(index, _)| *index);
	results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn results_keep_chunk_order() {
		let cfg = LmConfig::builder().threads(4).chunk_factor(2).build().expect("config");
		let items: Vec<usize> = (0..100).collect();
		let sums = fork_join(&items, &cfg, |offset, chunk| (offset, chunk.iter().sum::<usize>()));
		let offsets: Vec<usize> = sums.iter().map(|(offset, _)| *offset).collect();
		let mut sorted = offsets.clone();
		sorted.sort_unstable();
		assert_eq!(offsets, sorted);
		assert_eq!(offsets[0], 0);
		assert_eq!(sums.iter().map(|(_, s)| s).sum::<usize>(), 4950);
	}

	#[test]
	fn huge_chunk_factor_is_bounded_by_the_input() {
		let cfg = LmConfig { threads: Some(2), chunk_factor: usize::MAX, ..LmConfig::default() };
		let items: Vec<usize> = (0..10).collect();
		let lens = fork_join(&items, &cfg, |_, chunk| chunk.len());
		assert_eq!(lens, vec![1; 10]);
	}

	#[test]
	fn empty_input_forks_nothing() {
		let out: Vec<usize> = fork_join(&[] as &[u8], &LmConfig::default(), |_, chunk| chunk.len());
		assert!(out.is_empty());
	}
}
