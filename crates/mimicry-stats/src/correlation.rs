//! Pearson correlation coefficient.

/// Computes the Pearson correlation coefficient of two series.
///
/// Pairs are zipped, so the longer series is truncated to the shorter one.
///
/// # Returns
///
/// * `Some(r)` with `r` in `[-1, 1]` - if both series have non-zero variance
/// * `None` - if the series are empty or either one is constant
///
/// # Examples
///
/// ```
/// use mimicry_stats::correlation::pearson;
///
/// let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
/// assert!((r + 1.0).abs() < 1e-6);
///
/// assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
/// ```
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn pearson(xs: &[f32], ys: &[f32]) -> Option<f32> {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return None;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];
    let mean_x = xs.iter().map(|&x| f64::from(x)).sum::<f64>() / n as f64;
    let mean_y = ys.iter().map(|&y| f64::from(y)).sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = f64::from(x) - mean_x;
        let dy = f64::from(y) - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }
    if variance_x <= 0.0 || variance_y <= 0.0 {
        return None;
    }
    let r = covariance / (variance_x * variance_y).sqrt();
    Some(r.clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_positive_correlation() {
        let r = pearson(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_uncorrelated_series() {
        let r = pearson(&[1.0, 2.0, 3.0, 4.0], &[1.0, -1.0, -1.0, 1.0]).unwrap();
        assert!(r.abs() < 1e-6);
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn test_truncates_to_shorter_series() {
        let r = pearson(&[1.0, 2.0, 3.0, 100.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-6);
    }
}
