//! Numeric summaries for the mimicry training engine.
//!
//! This crate has no dependencies and no knowledge of networks or datasets. It
//! works on plain `f32` series and prediction/target pairs:
//!
//! - **Series summaries**: streaming min/max/mean/standard deviation of a loss series
//! - **Prediction metrics**: mean-absolute accuracy, per-sample action accuracy,
//!   temporal consistency and mean squared error
//! - **Correlation**: Pearson correlation between two equally long series
//!
//! # Modules
//!
//! - [`summary`]: Streaming summary of a series (e.g. batch losses within one epoch)
//! - [`metrics`]: Accuracy-style metrics computed from predictions and targets
//! - [`correlation`]: Pearson correlation coefficient
//!
//! # Examples
//!
//! ## Summarizing batch losses
//!
//! ```
//! use mimicry_stats::summary::RunningSummary;
//!
//! let mut losses = RunningSummary::new();
//! for loss in [0.5, 0.25, 0.75] {
//!     losses.push(loss);
//! }
//! let summary = losses.summary().unwrap();
//! assert_eq!(summary.count, 3);
//! assert_eq!(summary.min, 0.25);
//! assert_eq!(summary.mean, 0.5);
//! ```
//!
//! ## Scoring predictions
//!
//! ```
//! use mimicry_stats::metrics;
//!
//! let predictions = [[1.0, 0.0], [0.0, 1.0]];
//! let targets = [[1.0, 0.0], [1.0, 1.0]];
//! assert_eq!(metrics::action_accuracy(&predictions, &targets, 0.5), 0.5);
//! ```
//!
//! ## Correlating a feature with an action
//!
//! ```
//! use mimicry_stats::correlation::pearson;
//!
//! let feature = [1.0, 2.0, 3.0];
//! let action = [2.0, 4.0, 6.0];
//! assert!((pearson(&feature, &action).unwrap() - 1.0).abs() < 1e-6);
//! ```

pub mod correlation;
pub mod metrics;
pub mod summary;
