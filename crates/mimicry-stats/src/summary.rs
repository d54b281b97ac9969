/// Summary of a series of `f32` values.
///
/// Produced by [`RunningSummary::summary`]. The training loop uses it to
/// report the spread of batch losses within one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    /// Number of values observed.
    pub count: usize,
    /// The minimum value observed.
    pub min: f32,
    /// The maximum value observed.
    pub max: f32,
    /// The arithmetic mean of the values.
    pub mean: f32,
    /// The population standard deviation of the values.
    pub std_dev: f32,
    /// The most recently observed value.
    pub last: f32,
}

/// Streaming accumulator for [`SeriesSummary`].
///
/// Values are folded in one at a time (Welford's algorithm), so a series never
/// has to be collected into memory. Mean and variance are accumulated in `f64`
/// to keep long series of small losses stable.
#[derive(Debug, Clone, Default)]
pub struct RunningSummary {
    count: usize,
    min: f32,
    max: f32,
    mean: f64,
    m2: f64,
    last: f32,
}

impl RunningSummary {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one value to the series.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mimicry_stats::summary::RunningSummary;
    /// let mut summary = RunningSummary::new();
    /// summary.push(2.0);
    /// summary.push(4.0);
    /// assert_eq!(summary.len(), 2);
    /// assert_eq!(summary.summary().unwrap().max, 4.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f32) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = f32::min(self.min, value);
            self.max = f32::max(self.max, value);
        }
        self.count += 1;
        self.last = value;

        let value = f64::from(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Returns the number of values pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no value has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the summary of all values pushed so far.
    ///
    /// # Returns
    ///
    /// * `Some(SeriesSummary)` - if at least one value was pushed
    /// * `None` - if the series is empty
    #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    #[must_use]
    pub fn summary(&self) -> Option<SeriesSummary> {
        if self.count == 0 {
            return None;
        }
        let variance = self.m2 / self.count as f64;
        Some(SeriesSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean as f32,
            std_dev: variance.sqrt() as f32,
            last: self.last,
        })
    }
}

impl FromIterator<f32> for RunningSummary {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut summary = Self::new();
        for value in iter {
            summary.push(value);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series_has_no_summary() {
        let summary = RunningSummary::new();
        assert!(summary.is_empty());
        assert!(summary.summary().is_none());
    }

    #[test]
    fn test_single_value() {
        let summary: RunningSummary = [3.5].into_iter().collect();
        let s = summary.summary().unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.min, 3.5);
        assert_eq!(s.max, 3.5);
        assert_eq!(s.mean, 3.5);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.last, 3.5);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let summary: RunningSummary = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .collect();
        let s = summary.summary().unwrap();
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-6);
        assert!((s.std_dev - 2.0).abs() < 1e-6);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.last, 9.0);
    }

    #[test]
    fn test_negative_values_track_min() {
        let summary: RunningSummary = [-1.0, -3.0, 2.0].into_iter().collect();
        let s = summary.summary().unwrap();
        assert_eq!(s.min, -3.0);
        assert_eq!(s.max, 2.0);
    }
}
