//! Trailing-window mean and standard deviation.
//!
//! Each window is recomputed from its own samples rather than maintained as a
//! running sum, so a constant window always yields a standard deviation of
//! exactly zero and repeated runs are bit-for-bit identical.

use serde::{Deserialize, Serialize};

/// Rolling statistics for one index of a series, with the anomaly bounds
/// derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub moving_average: f64,
    pub std_dev: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Baseline {
    /// Bounds are `mean ± threshold * std_dev`.
    pub fn new(moving_average: f64, std_dev: f64, threshold: f64) -> Self {
        let spread = threshold * std_dev;
        Self {
            moving_average,
            std_dev,
            lower_bound: moving_average - spread,
            upper_bound: moving_average + spread,
        }
    }
}

/// Arithmetic mean; `None` for an empty window or one holding a non-finite value.
pub fn window_mean(window: &[f64]) -> Option<f64> {
    if window.is_empty() || window.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Sample standard deviation (divisor `n - 1`) around `mean`.
pub fn window_std(window: &[f64], mean: f64) -> Option<f64> {
    if window.len() < 2 || !mean.is_finite() {
        return None;
    }
    let sum_sq: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
    let std = (sum_sq / (window.len() - 1) as f64).sqrt();
    std.is_finite().then_some(std)
}

/// Baseline for every index of `values`, computed over `values[i + 1 - lag ..= i]`.
///
/// The first `lag - 1` entries are `None`, as is any index whose window holds
/// a non-finite value. A `lag` of 0 or 1 never has a sample standard
/// deviation, so every entry is `None`.
pub fn rolling_baseline(values: &[f64], lag: usize, threshold: f64) -> Vec<Option<Baseline>> {
    let mut baselines = vec![None; values.len()];
    if lag == 0 {
        return baselines;
    }

    for (start, window) in values.windows(lag).enumerate() {
        let Some(mean) = window_mean(window) else {
            continue;
        };
        let Some(std) = window_std(window, mean) else {
            continue;
        };
        baselines[start + lag - 1] = Some(Baseline::new(mean, std, threshold));
    }

    baselines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(lhs: f64, rhs: f64) -> bool {
        (lhs - rhs).abs() < 1e-9
    }

    #[test]
    fn warm_up_is_undefined_not_zero() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let baselines = rolling_baseline(&values, 3, 2.0);

        assert_eq!(baselines.len(), values.len());
        assert!(baselines[0].is_none());
        assert!(baselines[1].is_none());
        assert!(baselines[2..].iter().all(Option::is_some));
    }

    #[test]
    fn uses_sample_standard_deviation() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let baselines = rolling_baseline(&values, values.len(), 1.0);
        let last = baselines.last().copied().flatten().unwrap();

        assert!(approx(last.moving_average, 5.0));
        // Population std of this set is 2.0; the sample std is sqrt(32 / 7).
        assert!(approx(last.std_dev, (32.0_f64 / 7.0).sqrt()));
    }

    #[test]
    fn window_slides_over_trailing_values() {
        let values = [1.0, 2.0, 3.0, 10.0];
        let baselines = rolling_baseline(&values, 2, 0.0);

        let means: Vec<Option<f64>> = baselines
            .iter()
            .map(|b| b.map(|b| b.moving_average))
            .collect();
        assert_eq!(means, vec![None, Some(1.5), Some(2.5), Some(6.5)]);
    }

    #[test]
    fn non_finite_input_poisons_only_its_windows() {
        let values = [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
        let baselines = rolling_baseline(&values, 2, 1.0);

        assert!(baselines[1].is_some());
        assert!(baselines[2].is_none());
        assert!(baselines[3].is_none());
        assert!(baselines[4].is_some());
        assert!(baselines[5].is_some());
    }

    #[test]
    fn degenerate_lags_yield_nothing() {
        let values = [1.0, 2.0, 3.0];
        assert!(rolling_baseline(&values, 0, 1.0).iter().all(Option::is_none));
        assert!(rolling_baseline(&values, 1, 1.0).iter().all(Option::is_none));
        assert!(rolling_baseline(&values, 4, 1.0).iter().all(Option::is_none));
        assert!(rolling_baseline(&[], 3, 1.0).is_empty());
    }

    #[test]
    fn bounds_bracket_the_moving_average() {
        let values: Vec<f64> = (0..200)
            .map(|i| 40.0 + (i as f64 * 0.7).sin() * 3.0 + (i % 7) as f64)
            .collect();

        for baseline in rolling_baseline(&values, 50, 3.5).into_iter().flatten() {
            assert!(baseline.lower_bound <= baseline.moving_average);
            assert!(baseline.moving_average <= baseline.upper_bound);
            assert!(approx(
                baseline.upper_bound - baseline.moving_average,
                baseline.moving_average - baseline.lower_bound,
            ));
        }
    }

    #[test]
    fn restartable_without_hidden_state() {
        let values: Vec<f64> = (0..120).map(|i| (i * 37 % 11) as f64).collect();
        assert_eq!(
            rolling_baseline(&values, 10, 2.0),
            rolling_baseline(&values, 10, 2.0)
        );
    }
}
