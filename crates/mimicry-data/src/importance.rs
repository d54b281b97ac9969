//! Feature importance by correlation with the move action
//!
//! Each state feature is scored by the absolute Pearson correlation between
//! its values and the recorded move action (`action[0]`) across all frames.
//! Features that never vary, or a move action that never varies, score zero.

use mimicry_stats::correlation;
use serde::{Deserialize, Serialize};

use crate::episode::{Episode, STATE_DIM};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Position of the feature in the state vector.
    pub index: usize,
    pub name: String,
    /// `|correlation|`
    pub importance: f32,
    pub correlation: f32,
}

/// Scores every state feature, most important first.
///
/// Ties keep ascending feature order.
#[must_use]
pub fn feature_importance(episodes: &[Episode]) -> Vec<FeatureImportance> {
    let frames = episodes.iter().flat_map(Episode::frames).collect::<Vec<_>>();
    let moves = frames.iter().map(|f| f.action()[0]).collect::<Vec<_>>();

    let mut column = Vec::with_capacity(frames.len());
    let mut scores = (0..STATE_DIM)
        .map(|index| {
            column.clear();
            column.extend(frames.iter().map(|f| f.state()[index]));
            let correlation = correlation::pearson(&column, &moves).unwrap_or(0.0);
            FeatureImportance {
                index,
                name: format!("Feature_{index}"),
                importance: correlation.abs(),
                correlation,
            }
        })
        .collect::<Vec<_>>();
    scores.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::Frame;

    #[test]
    fn test_correlated_feature_ranks_first() {
        #[expect(clippy::cast_precision_loss)]
        let frames = (0..20)
            .map(|i| {
                let x = i as f32 / 20.0;
                let mut state = vec![0.0; STATE_DIM];
                state[7] = x;
                state[3] = if i % 2 == 0 { 1.0 } else { 0.0 };
                Frame::new(state, [2.0 * x - 1.0, 0.0]).unwrap()
            })
            .collect();
        let scores = feature_importance(&[Episode::new(frames)]);

        assert_eq!(scores.len(), STATE_DIM);
        assert_eq!(scores[0].index, 7);
        assert_eq!(scores[0].name, "Feature_7");
        assert!((scores[0].importance - 1.0).abs() < 1e-5);
        assert!(scores[1].importance < scores[0].importance);
        assert!(scores.iter().filter(|s| s.importance == 0.0).count() >= STATE_DIM - 2);
    }

    #[test]
    fn test_no_frames_scores_zero() {
        let scores = feature_importance(&[]);
        assert!(scores.iter().all(|s| s.importance == 0.0));
        assert_eq!(scores[0].index, 0);
    }
}
