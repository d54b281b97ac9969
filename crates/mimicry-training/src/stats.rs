use mimicry_stats::metrics;
use serde::{Deserialize, Serialize};

/// Largest per-component error for a prediction to count as the right action.
pub const ACTION_TOLERANCE: f32 = 0.5;

/// Losses and metrics of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Mean of the epoch's batch losses.
    pub training_loss: f32,
    /// Standard deviation of the epoch's batch losses.
    pub training_loss_std: f32,
    pub validation_loss: f32,
    pub validation_accuracy: f32,
}

/// Scores of the validation partition after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct ValidationMetrics {
    pub(crate) loss: f32,
    pub(crate) accuracy: f32,
    pub(crate) action_accuracy: f32,
    pub(crate) temporal_consistency: f32,
}

impl ValidationMetrics {
    /// Scores raw predictions against targets, both in recording order.
    pub(crate) fn score<P, T>(predictions: &[P], targets: &[T]) -> Self
    where
        P: AsRef<[f32]>,
        T: AsRef<[f32]>,
    {
        Self {
            loss: metrics::mean_squared_error(predictions, targets),
            accuracy: metrics::mean_abs_accuracy(predictions, targets),
            action_accuracy: metrics::action_accuracy(predictions, targets, ACTION_TOLERANCE),
            temporal_consistency: metrics::temporal_consistency(predictions),
        }
    }
}

/// Progress of a training run, updated once per epoch.
///
/// While training runs, the loss and metric fields hold the values of the most
/// recent epoch. Once the best checkpoint is restored, the validation fields
/// are rescored on it and `training_accuracy` is measured on the training
/// partition, so a finished run describes the model it returns. `history`
/// keeps the per-epoch values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub training_loss: f32,
    pub validation_loss: f32,
    pub training_accuracy: f32,
    pub validation_accuracy: f32,
    /// Fraction of validation samples whose every output is within 0.5 of the target.
    pub action_accuracy: f32,
    /// Stability of consecutive validation predictions, in `(0, 1]`.
    pub temporal_consistency: f32,
    pub epochs_completed: usize,
    pub best_epoch: Option<usize>,
    pub best_validation_loss: Option<f32>,
    pub history: Vec<EpochRecord>,
}

impl TrainingStats {
    pub(crate) fn record_epoch(
        &mut self,
        epoch: usize,
        training_loss: f32,
        training_loss_std: f32,
        metrics: &ValidationMetrics,
    ) {
        self.training_loss = training_loss;
        self.validation_loss = metrics.loss;
        self.validation_accuracy = metrics.accuracy;
        self.action_accuracy = metrics.action_accuracy;
        self.temporal_consistency = metrics.temporal_consistency;
        self.epochs_completed = epoch + 1;
        self.history.push(EpochRecord {
            epoch,
            training_loss,
            training_loss_std,
            validation_loss: metrics.loss,
            validation_accuracy: metrics.accuracy,
        });
    }

    /// Overwrites the validation fields with the scores of the restored model.
    pub(crate) fn record_restored(&mut self, metrics: &ValidationMetrics) {
        self.validation_loss = metrics.loss;
        self.validation_accuracy = metrics.accuracy;
        self.action_accuracy = metrics.action_accuracy;
        self.temporal_consistency = metrics.temporal_consistency;
    }

    pub(crate) fn record_best(&mut self, epoch: usize, validation_loss: f32) {
        self.best_epoch = Some(epoch);
        self.best_validation_loss = Some(validation_loss);
    }

    /// Validation loss history, one entry per completed epoch.
    pub fn validation_losses(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().map(|r| r.validation_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_epoch_updates_current_values() {
        let mut stats = TrainingStats::default();
        let metrics = ValidationMetrics {
            loss: 0.4,
            accuracy: 0.7,
            action_accuracy: 0.5,
            temporal_consistency: 0.9,
        };
        stats.record_epoch(0, 0.6, 0.1, &metrics);
        stats.record_best(0, 0.4);
        stats.record_epoch(1, 0.5, 0.05, &ValidationMetrics { loss: 0.45, ..metrics });

        assert_eq!(stats.epochs_completed, 2);
        assert_eq!(stats.training_loss, 0.5);
        assert_eq!(stats.validation_loss, 0.45);
        assert_eq!(stats.best_epoch, Some(0));
        assert_eq!(stats.validation_losses().collect::<Vec<_>>(), [0.4, 0.45]);
    }

    #[test]
    fn test_record_restored_keeps_history() {
        let mut stats = TrainingStats::default();
        let metrics = ValidationMetrics {
            loss: 0.3,
            accuracy: 0.8,
            action_accuracy: 0.6,
            temporal_consistency: 0.9,
        };
        stats.record_epoch(0, 0.5, 0.0, &metrics);
        stats.record_epoch(1, 0.4, 0.0, &ValidationMetrics { loss: 0.6, ..metrics });
        stats.record_restored(&metrics);

        assert_eq!(stats.validation_loss, 0.3);
        assert_eq!(stats.training_loss, 0.4);
        assert_eq!(stats.validation_losses().collect::<Vec<_>>(), [0.3, 0.6]);
    }

    #[test]
    fn test_score() {
        let predictions = [[1.0, 0.0], [0.8, 0.0]];
        let targets = [[1.0, 0.0], [0.0, 0.0]];
        let metrics = ValidationMetrics::score(&predictions, &targets);
        assert!((metrics.loss - 0.16).abs() < 1e-6);
        assert!((metrics.accuracy - 0.8).abs() < 1e-6);
        assert!((metrics.action_accuracy - 0.5).abs() < 1e-6);
        assert!((metrics.temporal_consistency - 1.0 / 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut stats = TrainingStats::default();
        stats.record_best(3, 0.25);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""best_epoch":3"#));
        let back: TrainingStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
