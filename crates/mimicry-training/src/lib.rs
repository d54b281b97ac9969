//! Training orchestration for the mimicry behavior-cloning models.
//!
//! This crate drives the networks of `mimicry-nn` over the datasets of
//! `mimicry-data`: it splits demonstrations into training and validation
//! partitions, runs the epoch loop with mini-batches and the Adam optimizer,
//! stops early when validation loss stalls, and keeps checkpoints of the best
//! model seen so far.
//!
//! # How Training Works
//!
//! 1. **Split** - Samples (frames or sequence windows) are shuffled with the
//!    trainer's seeded RNG and partitioned by the configured validation fraction
//! 2. **Epoch** - Training samples are reshuffled and fed in batches; every
//!    batch is one optimizer step on the shared global step counter
//! 3. **Validate** - The whole validation partition is scored (loss, accuracy,
//!    action accuracy, temporal consistency)
//! 4. **Early stopping** - An improvement larger than `min_delta` resets the
//!    patience counter and snapshots the parameters as the best checkpoint
//! 5. **Exit** - When epochs run out, patience is exhausted or the run is
//!    cancelled, the best checkpoint is restored into the model
//!
//! ```text
//! Episodes ─► Splitter ─► batches ─► Network::train ─► Adam
//!                 │                                    │
//!                 └──► validation ─► EarlyStopping ─► CheckpointStore
//! ```
//!
//! # Modules
//!
//! - [`config`]: Serde-loadable run configurations with defaults
//! - [`dense`]: [`DenseTrainer`] for the single-frame network
//! - [`sequence`]: [`SequenceTrainer`] for the recurrent network over windows
//! - [`manager`]: [`TrainingManager`] running one or both trainers
//! - [`early_stopping`]: Patience-based stopping state machine
//! - [`checkpoint`]: Best and periodic checkpoints, in memory and on disk
//! - [`stats`]: [`TrainingStats`] updated once per epoch
//!
//! # Example
//!
//! ```
//! use mimicry_data::episode::{Episode, Frame};
//! use mimicry_training::{DenseTrainer, StopReason, config::TrainingConfig};
//!
//! let frames = (0..10)
//!     .map(|_| Frame::new(vec![0.0; 130], [1.0, 0.0]).unwrap())
//!     .collect();
//! let episodes = [Episode::new(frames)];
//!
//! let config = TrainingConfig {
//!     epochs: 3,
//!     seed: Some(7),
//!     ..TrainingConfig::default()
//! };
//! let mut trainer = DenseTrainer::new(config).unwrap();
//! let outcome = trainer.train_from_data(&episodes).unwrap();
//! assert_eq!(outcome.stop_reason, StopReason::EpochsExhausted);
//! assert_eq!(outcome.stats.epochs_completed, 3);
//! ```

use std::borrow::Cow;

use mimicry_data::{
    augment::AugmentError,
    episode::{DatasetError, Episode},
    split::SplitError,
    thin::{self, IdleThinning, ThinError},
    window::WindowError,
};
use mimicry_nn::{NnError, persist::PersistError};
use serde::{Deserialize, Serialize};

pub use self::{
    cancel::CancelFlag, dense::DenseTrainer, manager::*, sequence::SequenceTrainer,
    stats::TrainingStats,
};

mod cancel;
pub mod checkpoint;
pub mod config;
pub mod dense;
pub mod early_stopping;
pub mod manager;
mod orchestrator;
pub mod sequence;
pub mod stats;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("no training data")]
    NoTrainingData,
    #[display("insufficient data: {samples} samples cannot form both training and validation sets")]
    InsufficientData { samples: usize },
    #[display("invalid training configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    #[display("invalid dataset: {_0}")]
    #[from]
    Dataset(DatasetError),
    #[display("invalid window configuration: {_0}")]
    #[from]
    Window(WindowError),
    #[display("invalid validation split: {_0}")]
    #[from]
    Split(SplitError),
    #[display("augmentation failed: {_0}")]
    #[from]
    Augment(AugmentError),
    #[display("invalid idle thinning: {_0}")]
    #[from]
    Thin(ThinError),
    #[display("network error: {_0}")]
    #[from]
    Network(NnError),
    #[display("model persistence failed: {_0}")]
    #[from]
    Persist(PersistError),
}

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every configured epoch ran.
    EpochsExhausted,
    /// Validation loss did not improve for `patience` epochs.
    EarlyStopped,
    /// The run's [`CancelFlag`] was raised.
    Cancelled,
}

/// Result of a completed training run.
///
/// The trained model has already been reset to its best checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub stats: TrainingStats,
    pub stop_reason: StopReason,
}

/// Applies the configured idle thinning to every episode.
fn thinned<'a>(episodes: &'a [Episode], thinning: Option<&IdleThinning>) -> Result<Cow<'a, [Episode]>, TrainError> {
    let Some(thinning) = thinning else {
        return Ok(Cow::Borrowed(episodes));
    };
    let episodes = episodes
        .iter()
        .map(|episode| thin::thin_idle_runs(episode, thinning))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Cow::Owned(episodes))
}
