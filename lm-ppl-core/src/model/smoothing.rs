use serde::{Deserialize, Serialize};

/// Turns raw counts into conditional probabilities.
///
/// Estimators never touch the stored counts; a fitted model can be
/// re-smoothed with [`NGramModel::with_smoothing`](super::NGramModel::with_smoothing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
	/// Maximum likelihood: `count / context_total`.
	///
	/// Unseen events get probability zero, which callers turn into errors.
	Unsmoothed,
	/// Add-one: `(count + 1) / (context_total + support)`.
	#[default]
	Laplace,
}

impl Smoothing {
	/// Estimates `P(next | context)` from the raw counts.
	///
	/// - `count`: observed `(context, next)` transitions
	/// - `context_total`: observed transitions out of `context`
	/// - `support`: number of possible next tokens
	///
	/// Returns `None` when the estimate is zero or undefined.
	pub fn estimate(self, count: u64, context_total: u64, support: usize) -> Option<f64> {
		let probability = match self {
			Smoothing::Unsmoothed => {
				if context_total == 0 {
					return None;
				}
				count as f64 / context_total as f64
			}
			Smoothing::Laplace => (count as f64 + 1.0) / (context_total as f64 + support as f64),
		};
		(probability > 0.0 && probability.is_finite()).then_some(probability)
	}
}

impl std::fmt::Display for Smoothing {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Smoothing::Unsmoothed => "unsmoothed",
			Smoothing::Laplace => "laplace",
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_matches_the_serialized_name() {
		for smoothing in [Smoothing::Unsmoothed, Smoothing::Laplace] {
			let json = serde_json::to_string(&smoothing).expect("json");
			assert_eq!(json, format!("\"{smoothing}\""));
		}
	}

	#[test]
	fn laplace_matches_the_cat_example() {
		// count(the -> cat) = 1, count(the) = 2, V = 4
		let p = Smoothing::Laplace.estimate(1, 2, 4).expect("probability");
		assert!((p - 1.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn laplace_never_returns_zero() {
		let p = Smoothing::Laplace.estimate(0, 0, 10).expect("probability");
		assert!((p - 0.1).abs() < 1e-12);
	}

	#[test]
	fn unsmoothed_reports_zero_mass() {
		assert_eq!(Smoothing::Unsmoothed.estimate(0, 5, 3), None);
		assert_eq!(Smoothing::Unsmoothed.estimate(0, 0, 3), None);
		assert_eq!(Smoothing::Unsmoothed.estimate(5, 5, 3), Some(1.0));
	}

	#[test]
	fn laplace_row_sums_to_one() {
		let counts = [3u64, 0, 1, 0, 6];
		let total: u64 = counts.iter().sum();
		let sum: f64 = counts
			.iter()
			.map(|c| Smoothing::Laplace.estimate(*c, total, counts.len()).expect("probability"))
			.sum();
		assert!((sum - 1.0).abs() < 1e-12);
	}
}
