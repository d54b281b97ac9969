//! Trainer for the single-frame [`DenseNetwork`].
//!
//! Every frame of every episode is one sample: its state is the input and its
//! action the target. Frames are split once per run; each epoch reshuffles the
//! training frames and steps through them in batches of `batch_size`.

use std::path::Path;

use mimicry_data::{
    augment,
    episode::{Action, Episode, Frame},
    split::{Split, Splitter},
};
use mimicry_nn::{DenseNetwork, params::ParameterSet};
use mimicry_stats::{
    metrics,
    summary::{RunningSummary, SeriesSummary},
};
use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;

use crate::{
    CancelFlag, TrainError, TrainingOutcome,
    checkpoint::CheckpointStore,
    config::TrainingConfig,
    orchestrator::{self, EpochModel, LoopSettings},
    stats::{TrainingStats, ValidationMetrics},
};

#[derive(Debug, Clone)]
pub struct DenseTrainer {
    config: TrainingConfig,
    network: DenseNetwork,
    rng: Pcg32,
    step: u64,
    stats: TrainingStats,
    cancel: CancelFlag,
}

impl DenseTrainer {
    /// Creates a trainer with a freshly initialized network.
    ///
    /// The RNG is seeded from `config.seed`, or from the operating system when
    /// no seed is set.
    pub fn new(config: TrainingConfig) -> Result<Self, TrainError> {
        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Self::with_rng(config, rng)
    }

    /// Creates a trainer that draws initialization, shuffling and
    /// augmentation from `rng`.
    pub fn with_rng(config: TrainingConfig, mut rng: Pcg32) -> Result<Self, TrainError> {
        config.validate()?;
        let network = DenseNetwork::new(&config.layer_sizes(), &mut rng)?.with_workers(config.workers);
        Ok(Self {
            config,
            network,
            rng,
            step: 0,
            stats: TrainingStats::default(),
            cancel: CancelFlag::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    #[must_use]
    pub fn network(&self) -> &DenseNetwork {
        &self.network
    }

    #[must_use]
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Optimizer steps taken so far.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn set_cancel_flag(&mut self, cancel: CancelFlag) {
        self.cancel = cancel;
    }

    /// Trains on every frame of `episodes` until the epochs run out, patience
    /// is exhausted or the run is cancelled.
    ///
    /// On return the network holds the parameters of the epoch with the lowest
    /// validation loss. When the validation fraction leaves no frame for
    /// validation, the training frames are used instead.
    pub fn train_from_data(&mut self, episodes: &[Episode]) -> Result<TrainingOutcome, TrainError> {
        let episodes = crate::thinned(episodes, self.config.idle_thinning.as_ref())?;
        let frames = episodes.iter().flat_map(Episode::frames).collect::<Vec<_>>();
        if frames.is_empty() {
            return Err(TrainError::NoTrainingData);
        }
        let splitter = Splitter::new(self.config.validation_split)?;
        let indices = (0..frames.len()).collect::<Vec<_>>();
        let Split {
            mut train,
            mut validation,
        } = splitter.split(&indices, &mut self.rng);
        if train.is_empty() {
            return Err(TrainError::InsufficientData {
                samples: frames.len(),
            });
        }
        if validation.is_empty() {
            tracing::warn!(frames = frames.len(), "no frames left for validation, validating on training frames");
            validation.clone_from(&train);
        }
        validation.sort_unstable();

        let augmented = if self.config.augment_noise_std > 0.0 {
            let originals = train.iter().map(|&i| frames[i].clone()).collect::<Vec<_>>();
            augment::with_state_noise(&originals, self.config.augment_noise_std, &mut self.rng)?
        } else {
            vec![]
        };
        let mut samples = frames;
        train.extend(samples.len()..samples.len() + augmented.len());
        samples.extend(&augmented);

        tracing::info!(
            training = train.len(),
            validation = validation.len(),
            augmented = augmented.len(),
            "starting dense training"
        );

        self.stats = TrainingStats::default();
        let mut checkpoints = CheckpointStore::new(
            self.config.checkpoint_dir.as_deref(),
            "model",
            self.config.checkpoint_interval,
        );
        let settings = LoopSettings {
            epochs: self.config.epochs,
            patience: self.config.patience,
            min_delta: self.config.min_delta,
        };
        let mut run = DenseRun {
            network: &mut self.network,
            rng: &mut self.rng,
            step: &mut self.step,
            config: &self.config,
            samples: &samples,
            train,
            validation,
        };
        let stop_reason = orchestrator::run_epochs(&mut run, settings, &mut checkpoints, &self.cancel, &mut self.stats)?;
        self.stats.training_accuracy = run.training_accuracy()?;

        tracing::info!(
            ?stop_reason,
            epochs = self.stats.epochs_completed,
            best_epoch = ?self.stats.best_epoch,
            training_accuracy = self.stats.training_accuracy,
            validation_accuracy = self.stats.validation_accuracy,
            "dense training finished"
        );
        Ok(TrainingOutcome {
            stats: self.stats.clone(),
            stop_reason,
        })
    }

    /// Runs one optimizer step on `batch` at global step `step` and returns
    /// the batch loss.
    pub fn train_step(&mut self, batch: &[&Frame], step: u64) -> Result<f32, TrainError> {
        train_batch(&mut self.network, batch, self.config.learning_rate, step)
    }

    /// Mean-squared loss over every frame of `episodes`.
    pub fn evaluate(&self, episodes: &[Episode]) -> Result<f32, TrainError> {
        let frames = episodes.iter().flat_map(Episode::frames);
        let (states, actions): (Vec<_>, Vec<_>) = frames.map(|f| (f.state(), f.action())).unzip();
        Ok(self.network.evaluate(&states, &actions)?)
    }

    /// Discrete `[move, energy]` action for one state.
    pub fn predict(&self, state: &[f32]) -> Result<Action, TrainError> {
        Ok(self.network.predict(state)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        self.network.save(path)?;
        Ok(())
    }

    /// Loads a saved model; on error the current parameters stay in place.
    pub fn load(&mut self, path: &Path) -> Result<(), TrainError> {
        self.network.load(path)?;
        Ok(())
    }
}

fn train_batch(network: &mut DenseNetwork, batch: &[&Frame], lr: f32, step: u64) -> Result<f32, TrainError> {
    let (states, actions): (Vec<_>, Vec<_>) = batch.iter().map(|f| (f.state(), f.action())).unzip();
    Ok(network.train(&states, &actions, lr, step)?)
}

/// One training run over a fixed split of frames.
struct DenseRun<'a> {
    network: &'a mut DenseNetwork,
    rng: &'a mut Pcg32,
    step: &'a mut u64,
    config: &'a TrainingConfig,
    samples: &'a [&'a Frame],
    train: Vec<usize>,
    /// Ascending, so predictions follow recording order.
    validation: Vec<usize>,
}

impl<'a> DenseRun<'a> {
    fn frames(&self, indices: &[usize]) -> Vec<&'a Frame> {
        indices.iter().map(|&i| self.samples[i]).collect()
    }

    fn score(&self, indices: &[usize]) -> Result<(Vec<Vec<f32>>, Vec<Action>), TrainError> {
        let (states, targets): (Vec<_>, Vec<_>) = indices
            .iter()
            .map(|&i| (self.samples[i].state(), self.samples[i].action()))
            .unzip();
        let predictions = self.network.forward_batch(&states)?;
        Ok((predictions, targets))
    }

    fn training_accuracy(&self) -> Result<f32, TrainError> {
        let (predictions, targets) = self.score(&self.train)?;
        Ok(metrics::mean_abs_accuracy(&predictions, &targets))
    }
}

impl EpochModel for DenseRun<'_> {
    fn train_epoch(&mut self, cancel: &CancelFlag) -> Result<Option<SeriesSummary>, TrainError> {
        self.train.shuffle(self.rng);
        let mut losses = RunningSummary::new();
        for indices in self.train.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let batch = self.frames(indices);
            let loss = train_batch(self.network, &batch, self.config.learning_rate, *self.step)?;
            tracing::debug!(step = *self.step, samples = batch.len(), loss, "batch");
            *self.step += 1;
            losses.push(loss);
        }
        Ok(losses.summary())
    }

    fn validate(&self) -> Result<ValidationMetrics, TrainError> {
        let (predictions, targets) = self.score(&self.validation)?;
        Ok(ValidationMetrics::score(&predictions, &targets))
    }

    fn parameters(&self) -> &ParameterSet {
        self.network.parameters()
    }

    fn restore(&mut self, params: ParameterSet) -> Result<(), TrainError> {
        Ok(self.network.set_parameters(params)?)
    }
}
