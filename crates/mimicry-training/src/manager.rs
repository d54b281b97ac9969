use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use mimicry_data::episode::{Episode, validate_episodes};
use serde::{Deserialize, Serialize};

use crate::{
    CancelFlag, DenseTrainer, SequenceTrainer, StopReason, TrainError, TrainingStats,
    config::{SequenceTrainingConfig, TrainingConfig},
};

/// Which models a [`TrainingManager`] trains.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// The single-frame dense network.
    #[default]
    Traditional,
    /// The recurrent network over windows.
    Sequence,
    /// Both, one after the other.
    Hybrid,
}

impl TrainingMode {
    #[must_use]
    pub fn trains_dense(self) -> bool {
        matches!(self, Self::Traditional | Self::Hybrid)
    }

    #[must_use]
    pub fn trains_sequence(self) -> bool {
        matches!(self, Self::Sequence | Self::Hybrid)
    }
}

/// Per-model result of a [`TrainingManager::start_training`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub stats: TrainingStats,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mode: TrainingMode,
    pub traditional: Option<ModelReport>,
    pub sequence: Option<ModelReport>,
    /// Validation accuracy of the trained model; the mean of both in hybrid mode.
    pub accuracy: f32,
    pub elapsed_seconds: f64,
}

/// Runs the dense trainer, the sequence trainer or both over one dataset.
///
/// Both trainers share one [`CancelFlag`].
#[derive(Debug, Clone)]
pub struct TrainingManager {
    mode: TrainingMode,
    model_dir: PathBuf,
    dense: DenseTrainer,
    sequence: SequenceTrainer,
    cancel: CancelFlag,
}

impl TrainingManager {
    pub fn new(
        mode: TrainingMode,
        model_dir: &Path,
        dense: TrainingConfig,
        sequence: SequenceTrainingConfig,
    ) -> Result<Self, TrainError> {
        Ok(Self::from_trainers(
            mode,
            model_dir,
            DenseTrainer::new(dense)?,
            SequenceTrainer::new(sequence)?,
        ))
    }

    #[must_use]
    pub fn from_trainers(
        mode: TrainingMode,
        model_dir: &Path,
        mut dense: DenseTrainer,
        mut sequence: SequenceTrainer,
    ) -> Self {
        let cancel = CancelFlag::new();
        dense.set_cancel_flag(cancel.clone());
        sequence.set_cancel_flag(cancel.clone());
        Self {
            mode,
            model_dir: model_dir.to_owned(),
            dense,
            sequence,
            cancel,
        }
    }

    #[must_use]
    pub fn mode(&self) -> TrainingMode {
        self.mode
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    #[must_use]
    pub fn dense(&self) -> &DenseTrainer {
        &self.dense
    }

    #[must_use]
    pub fn sequence(&self) -> &SequenceTrainer {
        &self.sequence
    }

    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Validates `episodes` and trains the models selected by the mode.
    pub fn start_training(&mut self, episodes: &[Episode]) -> Result<TrainingReport, TrainError> {
        validate_episodes(episodes)?;
        let frames = episodes.iter().map(Episode::len).sum::<usize>();
        tracing::info!(mode = %self.mode, episodes = episodes.len(), frames, "starting training");

        let start = Instant::now();
        let traditional = if self.mode.trains_dense() {
            let outcome = self.dense.train_from_data(episodes)?;
            Some(ModelReport {
                stats: outcome.stats,
                stop_reason: outcome.stop_reason,
            })
        } else {
            None
        };
        let sequence = if self.mode.trains_sequence() && !self.cancel.is_cancelled() {
            let outcome = self.sequence.train_from_sequences(episodes)?;
            Some(ModelReport {
                stats: outcome.stats,
                stop_reason: outcome.stop_reason,
            })
        } else {
            None
        };

        let accuracies = [&traditional, &sequence]
            .into_iter()
            .flatten()
            .map(|r| r.stats.validation_accuracy)
            .collect::<Vec<_>>();
        #[expect(clippy::cast_precision_loss)]
        let accuracy = if accuracies.is_empty() {
            0.0
        } else {
            accuracies.iter().sum::<f32>() / accuracies.len() as f32
        };
        let report = TrainingReport {
            mode: self.mode,
            traditional,
            sequence,
            accuracy,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            mode = %self.mode,
            accuracy = report.accuracy,
            elapsed_seconds = report.elapsed_seconds,
            "training finished"
        );
        Ok(report)
    }

    #[must_use]
    pub fn traditional_model_path(&self, prefix: &str) -> PathBuf {
        self.model_dir.join(format!("{prefix}_traditional_model.bin"))
    }

    #[must_use]
    pub fn sequence_model_path(&self, prefix: &str) -> PathBuf {
        self.model_dir.join(format!("{prefix}_sequence_model.bin"))
    }

    /// Saves the models selected by the mode into the model directory and
    /// returns the written paths.
    pub fn save_all(&self, prefix: &str) -> Result<Vec<PathBuf>, TrainError> {
        let mut saved = vec![];
        if self.mode.trains_dense() {
            let path = self.traditional_model_path(prefix);
            self.dense.save(&path)?;
            saved.push(path);
        }
        if self.mode.trains_sequence() {
            let path = self.sequence_model_path(prefix);
            self.sequence.save_sequence_model(&path)?;
            saved.push(path);
        }
        for path in &saved {
            tracing::info!(path = %path.display(), "saved model");
        }
        Ok(saved)
    }

    /// Loads the models selected by the mode, skipping files that do not
    /// exist, and returns the loaded paths.
    pub fn load_all(&mut self, prefix: &str) -> Result<Vec<PathBuf>, TrainError> {
        let mut loaded = vec![];
        if self.mode.trains_dense() {
            let path = self.traditional_model_path(prefix);
            if path.exists() {
                self.dense.load(&path)?;
                loaded.push(path);
            }
        }
        if self.mode.trains_sequence() {
            let path = self.sequence_model_path(prefix);
            if path.exists() {
                self.sequence.load_sequence_model(&path)?;
                loaded.push(path);
            }
        }
        for path in &loaded {
            tracing::info!(path = %path.display(), "loaded model");
        }
        Ok(loaded)
    }
}
