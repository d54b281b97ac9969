use mimicry_nn::params::ParameterSet;
use mimicry_stats::summary::SeriesSummary;

use crate::{
    CancelFlag, StopReason, TrainError,
    checkpoint::CheckpointStore,
    early_stopping::{EarlyStopping, StoppingDecision},
    stats::{TrainingStats, ValidationMetrics},
};

/// A model bound to its training and validation partitions.
pub(crate) trait EpochModel {
    /// Runs one pass over the training partition and summarizes the batch
    /// losses. Returns `None` if cancelled before the pass completed.
    fn train_epoch(&mut self, cancel: &CancelFlag) -> Result<Option<SeriesSummary>, TrainError>;

    fn validate(&self) -> Result<ValidationMetrics, TrainError>;

    fn parameters(&self) -> &ParameterSet;

    fn restore(&mut self, params: ParameterSet) -> Result<(), TrainError>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSettings {
    pub(crate) epochs: usize,
    pub(crate) patience: usize,
    pub(crate) min_delta: f32,
}

/// Runs epochs until they are exhausted, patience runs out or `cancel` is raised,
/// then restores the best checkpoint into `model` and scores it once more so
/// the headline fields of `stats` describe the restored model.
///
/// The best checkpoint is also restored when an epoch fails. The epoch error
/// takes precedence over a failed restore.
pub(crate) fn run_epochs<M>(
    model: &mut M,
    settings: LoopSettings,
    checkpoints: &mut CheckpointStore,
    cancel: &CancelFlag,
    stats: &mut TrainingStats,
) -> Result<StopReason, TrainError>
where
    M: EpochModel,
{
    let result = epoch_loop(model, settings, checkpoints, cancel, stats);
    let Some(best) = checkpoints.take_best() else {
        return result;
    };
    let restored = model.restore(best);
    if let (Err(_), Err(e)) = (&result, &restored) {
        tracing::warn!(error = %e, "failed to restore best checkpoint after a failed epoch");
    }
    let reason = result?;
    restored?;

    let metrics = model.validate()?;
    stats.record_restored(&metrics);
    tracing::info!(
        best_epoch = ?stats.best_epoch,
        validation_loss = metrics.loss,
        validation_accuracy = metrics.accuracy,
        "restored best checkpoint"
    );
    Ok(reason)
}

fn epoch_loop<M>(
    model: &mut M,
    settings: LoopSettings,
    checkpoints: &mut CheckpointStore,
    cancel: &CancelFlag,
    stats: &mut TrainingStats,
) -> Result<StopReason, TrainError>
where
    M: EpochModel,
{
    let mut stopping = EarlyStopping::new(settings.patience, settings.min_delta);
    for epoch in 0..settings.epochs {
        if cancel.is_cancelled() {
            tracing::info!(epoch, "training cancelled");
            return Ok(StopReason::Cancelled);
        }
        let Some(losses) = model.train_epoch(cancel)? else {
            tracing::info!(epoch, "training cancelled mid-epoch");
            return Ok(StopReason::Cancelled);
        };
        let metrics = model.validate()?;
        stats.record_epoch(epoch, losses.mean, losses.std_dev, &metrics);

        let decision = stopping.observe(epoch, metrics.loss);
        if decision == StoppingDecision::NewBest {
            stats.record_best(epoch, metrics.loss);
            checkpoints.record_best(epoch, model.parameters());
        }
        checkpoints.record_epoch(epoch, model.parameters());

        tracing::info!(
            epoch,
            training_loss = losses.mean,
            validation_loss = metrics.loss,
            validation_accuracy = metrics.accuracy,
            patience = stopping.counter(),
            "epoch finished"
        );
        if decision == StoppingDecision::Stop {
            tracing::info!(epoch, best_epoch = ?stopping.best_epoch(), "early stopping");
            return Ok(StopReason::EarlyStopped);
        }
    }
    Ok(StopReason::EpochsExhausted)
}

#[cfg(test)]
mod tests {
    use mimicry_nn::{NnError, params::LayerParams};
    use mimicry_stats::summary::RunningSummary;

    use super::*;

    /// Replays scripted validation losses; the bias records the epoch the
    /// parameters come from, and validation reads the loss of that epoch.
    struct Scripted {
        losses: Vec<f32>,
        epoch: usize,
        params: ParameterSet,
        cancel_at: Option<usize>,
        fail_at: Option<usize>,
        fail_restore: bool,
    }

    impl Scripted {
        fn new(losses: &[f32]) -> Self {
            Self {
                losses: losses.to_vec(),
                epoch: 0,
                params: ParameterSet::new(vec![LayerParams::zeros(1, 1)]),
                cancel_at: None,
                fail_at: None,
                fail_restore: false,
            }
        }
    }

    impl EpochModel for Scripted {
        fn train_epoch(&mut self, _cancel: &CancelFlag) -> Result<Option<SeriesSummary>, TrainError> {
            if self.cancel_at == Some(self.epoch) {
                return Ok(None);
            }
            if self.fail_at == Some(self.epoch) {
                return Err(NnError::NonFinite { layer: 0 }.into());
            }
            #[expect(clippy::cast_precision_loss)]
            let marker = self.epoch as f32;
            self.params.layers_mut()[0].bias[0] = marker;
            self.epoch += 1;
            let mut summary = RunningSummary::new();
            summary.push(1.0);
            Ok(summary.summary())
        }

        fn validate(&self) -> Result<ValidationMetrics, TrainError> {
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let epoch = self.params.layers()[0].bias[0] as usize;
            Ok(ValidationMetrics {
                loss: self.losses[epoch],
                ..ValidationMetrics::default()
            })
        }

        fn parameters(&self) -> &ParameterSet {
            &self.params
        }

        fn restore(&mut self, params: ParameterSet) -> Result<(), TrainError> {
            if self.fail_restore {
                return Err(TrainError::InvalidConfig {
                    reason: "restore rejected",
                });
            }
            self.params = params;
            Ok(())
        }
    }

    fn settings(epochs: usize, patience: usize) -> LoopSettings {
        LoopSettings {
            epochs,
            patience,
            min_delta: 1e-4,
        }
    }

    #[test]
    fn test_restores_best_epoch_parameters() {
        let mut model = Scripted::new(&[0.9, 0.5, 0.7, 0.8]);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let reason = run_epochs(
            &mut model,
            settings(4, 10),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap();
        assert_eq!(reason, StopReason::EpochsExhausted);
        assert_eq!(stats.epochs_completed, 4);
        assert_eq!(stats.best_epoch, Some(1));
        assert_eq!(model.params.layers()[0].bias[0], 1.0);
    }

    #[test]
    fn test_headline_stats_describe_restored_model() {
        let mut model = Scripted::new(&[0.9, 0.5, 0.7, 0.8]);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        run_epochs(
            &mut model,
            settings(4, 10),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap();
        assert_eq!(Some(stats.validation_loss), stats.best_validation_loss);
        assert_eq!(stats.validation_loss, 0.5);
        assert_eq!(stats.history.last().unwrap().validation_loss, 0.8);
    }

    #[test]
    fn test_epoch_error_wins_over_restore_error() {
        let mut model = Scripted::new(&[0.9, 0.5, 0.7]);
        model.fail_at = Some(2);
        model.fail_restore = true;
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let err = run_epochs(
            &mut model,
            settings(3, 10),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap_err();
        assert!(matches!(err, TrainError::Network(NnError::NonFinite { layer: 0 })));
        assert_eq!(stats.epochs_completed, 2);
    }

    #[test]
    fn test_epoch_error_still_restores_best() {
        let mut model = Scripted::new(&[0.9, 0.5, 0.7]);
        model.fail_at = Some(2);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let err = run_epochs(
            &mut model,
            settings(3, 10),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap_err();
        assert!(matches!(err, TrainError::Network(_)));
        assert_eq!(model.params.layers()[0].bias[0], 1.0);
    }

    #[test]
    fn test_early_stop_at_patience() {
        let mut model = Scripted::new(&[0.5; 20]);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let reason = run_epochs(
            &mut model,
            settings(20, 3),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap();
        assert_eq!(reason, StopReason::EarlyStopped);
        assert_eq!(stats.epochs_completed, 4);
        assert_eq!(stats.best_epoch, Some(0));
        assert_eq!(model.params.layers()[0].bias[0], 0.0);
    }

    #[test]
    fn test_cancellation_mid_epoch_restores_best() {
        let mut model = Scripted::new(&[0.5, 0.4, 0.3]);
        model.cancel_at = Some(2);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let reason = run_epochs(
            &mut model,
            settings(3, 10),
            &mut checkpoints,
            &CancelFlag::new(),
            &mut stats,
        )
        .unwrap();
        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(stats.epochs_completed, 2);
        assert_eq!(model.params.layers()[0].bias[0], 1.0);
    }

    #[test]
    fn test_raised_flag_stops_before_first_epoch() {
        let mut model = Scripted::new(&[0.5]);
        let mut checkpoints = CheckpointStore::new(None, "model", 0);
        let mut stats = TrainingStats::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let reason = run_epochs(&mut model, settings(1, 1), &mut checkpoints, &cancel, &mut stats).unwrap();
        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(stats.epochs_completed, 0);
        assert_eq!(stats.best_epoch, None);
    }
}
