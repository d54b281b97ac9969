//! Accuracy-style metrics over predictions and targets.
//!
//! All functions take predictions and targets as slices of rows (anything that
//! derefs to `[f32]`, e.g. `[f32; 2]` or `Vec<f32>`). Rows are compared
//! element-wise; pairs are zipped, so a longer slice is truncated to the
//! shorter one.
//!
//! Empty inputs never divide by zero: each function documents the value it
//! returns for an empty dataset.

/// Mean absolute accuracy: `1 - mean(|prediction - target|)` over all elements.
///
/// Returns `0.0` when there is nothing to compare.
///
/// # Examples
///
/// ```
/// use mimicry_stats::metrics::mean_abs_accuracy;
///
/// let accuracy = mean_abs_accuracy(&[[1.0, 0.5]], &[[1.0, 0.0]]);
/// assert_eq!(accuracy, 0.75);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_abs_accuracy<P, T>(predictions: &[P], targets: &[T]) -> f32
where
    P: AsRef<[f32]>,
    T: AsRef<[f32]>,
{
    let mut total_error = 0.0;
    let mut elements = 0_usize;
    for (p, t) in predictions.iter().zip(targets) {
        for (p, t) in p.as_ref().iter().zip(t.as_ref()) {
            total_error += (p - t).abs();
            elements += 1;
        }
    }
    if elements == 0 {
        return 0.0;
    }
    1.0 - total_error / elements as f32
}

/// Fraction of samples whose every component lies within `tolerance` of the target.
///
/// Returns `0.0` for an empty dataset.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn action_accuracy<P, T>(predictions: &[P], targets: &[T], tolerance: f32) -> f32
where
    P: AsRef<[f32]>,
    T: AsRef<[f32]>,
{
    let samples = predictions.len().min(targets.len());
    if samples == 0 {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(targets)
        .filter(|(p, t)| {
            p.as_ref()
                .iter()
                .zip(t.as_ref())
                .all(|(p, t)| (p - t).abs() < tolerance)
        })
        .count();
    correct as f32 / samples as f32
}

/// Temporal consistency of consecutive predictions.
///
/// For each consecutive pair the L1 distance `d` is mapped to `1 / (1 + d)`;
/// the result is the mean over all pairs, so `1.0` means the predictions never
/// change. Fewer than two predictions are trivially consistent (`1.0`).
///
/// # Examples
///
/// ```
/// use mimicry_stats::metrics::temporal_consistency;
///
/// assert_eq!(temporal_consistency(&[[0.0, 0.0], [0.0, 0.0]]), 1.0);
/// assert_eq!(temporal_consistency(&[[0.0, 0.0], [1.0, 0.0]]), 0.5);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn temporal_consistency<P>(predictions: &[P]) -> f32
where
    P: AsRef<[f32]>,
{
    if predictions.len() < 2 {
        return 1.0;
    }
    let sum = predictions
        .windows(2)
        .map(|pair| {
            let diff = pair[0]
                .as_ref()
                .iter()
                .zip(pair[1].as_ref())
                .map(|(a, b)| (a - b).abs())
                .sum::<f32>();
            1.0 / (1.0 + diff)
        })
        .sum::<f32>();
    sum / (predictions.len() - 1) as f32
}

/// Mean squared error over all elements.
///
/// Returns `0.0` for an empty dataset.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_squared_error<P, T>(predictions: &[P], targets: &[T]) -> f32
where
    P: AsRef<[f32]>,
    T: AsRef<[f32]>,
{
    let mut total = 0.0;
    let mut elements = 0_usize;
    for (p, t) in predictions.iter().zip(targets) {
        for (p, t) in p.as_ref().iter().zip(t.as_ref()) {
            total += (p - t).powi(2);
            elements += 1;
        }
    }
    if elements == 0 {
        return 0.0;
    }
    total / elements as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: [[f32; 2]; 0] = [];

    #[test]
    fn test_mean_abs_accuracy_perfect() {
        let rows = [[1.0, -1.0], [0.0, 0.5]];
        assert_eq!(mean_abs_accuracy(&rows, &rows), 1.0);
    }

    #[test]
    fn test_mean_abs_accuracy_empty() {
        assert_eq!(mean_abs_accuracy(&EMPTY, &EMPTY), 0.0);
    }

    #[test]
    fn test_action_accuracy_tolerance_is_strict() {
        let predictions = [[0.5, 0.0], [0.49, 0.0]];
        let targets = [[0.0, 0.0], [0.0, 0.0]];
        assert_eq!(action_accuracy(&predictions, &targets, 0.5), 0.5);
    }

    #[test]
    fn test_action_accuracy_requires_all_axes() {
        let predictions = [[1.0, 0.0]];
        let targets = [[1.0, 1.0]];
        assert_eq!(action_accuracy(&predictions, &targets, 0.5), 0.0);
    }

    #[test]
    fn test_action_accuracy_empty() {
        assert_eq!(action_accuracy(&EMPTY, &EMPTY, 0.5), 0.0);
    }

    #[test]
    fn test_temporal_consistency_single_prediction() {
        assert_eq!(temporal_consistency(&[[0.3, 0.7]]), 1.0);
        assert_eq!(temporal_consistency(&EMPTY), 1.0);
    }

    #[test]
    fn test_temporal_consistency_averages_pairs() {
        // pairs: d = 0 -> 1.0, d = 3 -> 0.25
        let predictions = [[0.0, 0.0], [0.0, 0.0], [1.0, 2.0]];
        assert!((temporal_consistency(&predictions) - 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_mean_squared_error() {
        let predictions = vec![vec![1.0, 2.0]];
        let targets = vec![vec![0.0, 0.0]];
        assert_eq!(mean_squared_error(&predictions, &targets), 2.5);
    }
}
