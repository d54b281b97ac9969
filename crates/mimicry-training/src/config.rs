//! Run configuration of the trainers.
//!
//! Both configurations deserialize from partial JSON: missing fields take the
//! defaults below.
//!
//! ```
//! use mimicry_training::config::TrainingConfig;
//!
//! let config: TrainingConfig = serde_json::from_str(r#"{ "epochs": 50, "seed": 1 }"#).unwrap();
//! assert_eq!(config.epochs, 50);
//! assert_eq!(config.batch_size, 64);
//! assert_eq!(config.patience, 10);
//! ```

use std::path::PathBuf;

use mimicry_data::{
    episode::{ACTION_DIM, STATE_DIM},
    thin::IdleThinning,
    window::WindowConfig,
};
use mimicry_nn::SequenceArchitecture;
use serde::{Deserialize, Serialize};

use crate::TrainError;

/// Configuration of a [`DenseTrainer`](crate::DenseTrainer) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    /// Fraction of frames held out for validation, in `[0, 1]`.
    pub validation_split: f32,
    /// Epochs without improvement before stopping.
    pub patience: usize,
    /// Smallest validation-loss decrease that counts as an improvement.
    pub min_delta: f32,
    /// Epochs between intermediate checkpoints; `0` disables them.
    pub checkpoint_interval: usize,
    /// Where checkpoints are written; `None` keeps them in memory only.
    pub checkpoint_dir: Option<PathBuf>,
    /// Hidden layer widths between the 130-wide input and the 2-wide output.
    pub hidden_layers: Vec<usize>,
    /// Standard deviation of Gaussian state noise for augmented copies of
    /// the training frames; `0` disables augmentation.
    pub augment_noise_std: f32,
    /// Thinning of long idle runs before the split; `None` keeps every frame.
    pub idle_thinning: Option<IdleThinning>,
    /// Threads used for gradient accumulation.
    pub workers: usize,
    /// RNG seed; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            epochs: 1000,
            learning_rate: 0.001,
            validation_split: 0.2,
            patience: 10,
            min_delta: 1e-4,
            checkpoint_interval: 20,
            checkpoint_dir: None,
            hidden_layers: vec![256, 128, 64, 32, 16],
            augment_noise_std: 0.0,
            idle_thinning: None,
            workers: 1,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Layer widths of the network, input and output included.
    #[must_use]
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(STATE_DIM);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(ACTION_DIM);
        sizes
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        check_common(self.batch_size, self.learning_rate, self.min_delta)?;
        if !(self.augment_noise_std.is_finite() && self.augment_noise_std >= 0.0) {
            return Err(TrainError::InvalidConfig {
                reason: "augment_noise_std must be finite and non-negative",
            });
        }
        if let Some(thinning) = &self.idle_thinning {
            thinning.validate()?;
        }
        Ok(())
    }
}

/// Configuration of a [`SequenceTrainer`](crate::SequenceTrainer) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTrainingConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    /// Per-step decay: the effective rate is `learning_rate / (1 + lr_decay·step)`.
    pub lr_decay: f32,
    pub validation_split: f32,
    pub patience: usize,
    pub min_delta: f32,
    pub checkpoint_interval: usize,
    pub checkpoint_dir: Option<PathBuf>,
    pub window: WindowConfig,
    /// Thinning of long idle runs before windowing; `None` keeps every frame.
    pub idle_thinning: Option<IdleThinning>,
    pub hidden1: usize,
    pub hidden2: usize,
    pub dense_hidden: usize,
    pub workers: usize,
    pub seed: Option<u64>,
}

impl Default for SequenceTrainingConfig {
    fn default() -> Self {
        let architecture = SequenceArchitecture::default();
        Self {
            batch_size: 32,
            epochs: 1000,
            learning_rate: 0.001,
            lr_decay: 0.001,
            validation_split: 0.2,
            patience: 15,
            min_delta: 1e-4,
            checkpoint_interval: 10,
            checkpoint_dir: None,
            window: WindowConfig::default(),
            idle_thinning: None,
            hidden1: architecture.hidden1,
            hidden2: architecture.hidden2,
            dense_hidden: architecture.dense_hidden,
            workers: 1,
            seed: None,
        }
    }
}

impl SequenceTrainingConfig {
    #[must_use]
    pub fn architecture(&self) -> SequenceArchitecture {
        SequenceArchitecture {
            input: STATE_DIM,
            hidden1: self.hidden1,
            hidden2: self.hidden2,
            dense_hidden: self.dense_hidden,
            output: ACTION_DIM,
        }
    }

    /// Learning rate for the optimizer step `step`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn learning_rate_at(&self, step: u64) -> f32 {
        self.learning_rate / (1.0 + self.lr_decay * step as f32)
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        check_common(self.batch_size, self.learning_rate, self.min_delta)?;
        if !(self.lr_decay.is_finite() && self.lr_decay >= 0.0) {
            return Err(TrainError::InvalidConfig {
                reason: "lr_decay must be finite and non-negative",
            });
        }
        self.window.validate()?;
        if let Some(thinning) = &self.idle_thinning {
            thinning.validate()?;
        }
        Ok(())
    }
}

fn check_common(batch_size: usize, learning_rate: f32, min_delta: f32) -> Result<(), TrainError> {
    if batch_size == 0 {
        return Err(TrainError::InvalidConfig {
            reason: "batch_size must be at least 1",
        });
    }
    if !(learning_rate.is_finite() && learning_rate >= 0.0) {
        return Err(TrainError::InvalidConfig {
            reason: "learning_rate must be finite and non-negative",
        });
    }
    if !(min_delta.is_finite() && min_delta >= 0.0) {
        return Err(TrainError::InvalidConfig {
            reason: "min_delta must be finite and non-negative",
        });
    }
    Ok(())
}
