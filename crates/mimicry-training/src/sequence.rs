//! Trainer for the recurrent [`SequenceNetwork`].
//!
//! Samples are [`SequenceWindow`]s cut from each episode: the network reads
//! the window's states and learns the action of the frame right after it.
//! Windows borrow their episodes, so splitting and batching never copy frame
//! data. The learning rate decays per optimizer step as
//! `learning_rate / (1 + lr_decay·step)`.

use std::path::Path;

use mimicry_data::{
    episode::{Action, Episode},
    split::{Split, Splitter},
    window::{SequenceWindow, sequence_windows},
};
use mimicry_nn::{SequenceInput, SequenceNetwork, params::ParameterSet};
use mimicry_stats::{
    metrics,
    summary::{RunningSummary, SeriesSummary},
};
use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;

use crate::{
    CancelFlag, TrainError, TrainingOutcome,
    checkpoint::CheckpointStore,
    config::SequenceTrainingConfig,
    orchestrator::{self, EpochModel, LoopSettings},
    stats::{TrainingStats, ValidationMetrics},
};

/// Feeds a window's states to the network.
#[derive(Debug, Clone, Copy)]
struct WindowInput<'a>(SequenceWindow<'a>);

impl SequenceInput for WindowInput<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn step(&self, index: usize) -> &[f32] {
        self.0.frames()[index].state()
    }
}

fn inputs_and_targets<'a, I>(windows: I) -> (Vec<WindowInput<'a>>, Vec<Action>)
where
    I: IntoIterator<Item = SequenceWindow<'a>>,
{
    windows
        .into_iter()
        .map(|w| (WindowInput(w), w.target_action()))
        .unzip()
}

#[derive(Debug, Clone)]
pub struct SequenceTrainer {
    config: SequenceTrainingConfig,
    network: SequenceNetwork,
    rng: Pcg32,
    step: u64,
    stats: TrainingStats,
    cancel: CancelFlag,
}

impl SequenceTrainer {
    pub fn new(config: SequenceTrainingConfig) -> Result<Self, TrainError> {
        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: SequenceTrainingConfig, mut rng: Pcg32) -> Result<Self, TrainError> {
        config.validate()?;
        let network = SequenceNetwork::new(config.architecture(), &mut rng)?.with_workers(config.workers);
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
    pub fn config(&self) -> &SequenceTrainingConfig {
        &self.config
    }

    #[must_use]
    pub fn network(&self) -> &SequenceNetwork {
        &self.network
    }

    #[must_use]
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

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

    /// Trains on the windows of `episodes`.
    ///
    /// Both partitions must end up non-empty; otherwise the run fails with
    /// [`TrainError::InsufficientData`] before any parameter changes.
    pub fn train_from_sequences(&mut self, episodes: &[Episode]) -> Result<TrainingOutcome, TrainError> {
        let episodes = crate::thinned(episodes, self.config.idle_thinning.as_ref())?;
        if episodes.iter().all(Episode::is_empty) {
            return Err(TrainError::NoTrainingData);
        }
        let windows = sequence_windows(&episodes, &self.config.window)?;
        let splitter = Splitter::new(self.config.validation_split)?;
        let indices = (0..windows.len()).collect::<Vec<_>>();
        let Split {
            train,
            mut validation,
        } = splitter.split(&indices, &mut self.rng);
        if train.is_empty() || validation.is_empty() {
            return Err(TrainError::InsufficientData {
                samples: windows.len(),
            });
        }
        validation.sort_unstable();

        tracing::info!(
            windows = windows.len(),
            training = train.len(),
            validation = validation.len(),
            length = self.config.window.length,
            "starting sequence training"
        );

        self.stats = TrainingStats::default();
        let mut checkpoints = CheckpointStore::new(
            self.config.checkpoint_dir.as_deref(),
            "sequence_model",
            self.config.checkpoint_interval,
        );
        let settings = LoopSettings {
            epochs: self.config.epochs,
            patience: self.config.patience,
            min_delta: self.config.min_delta,
        };
        let mut run = SequenceRun {
            network: &mut self.network,
            rng: &mut self.rng,
            step: &mut self.step,
            config: &self.config,
            windows: &windows,
            train,
            validation,
        };
        let stop_reason =
            orchestrator::run_epochs(&mut run, settings, &mut checkpoints, &self.cancel, &mut self.stats)?;
        self.stats.training_accuracy = run.training_accuracy()?;

        tracing::info!(
            ?stop_reason,
            epochs = self.stats.epochs_completed,
            best_epoch = ?self.stats.best_epoch,
            validation_accuracy = self.stats.validation_accuracy,
            temporal_consistency = self.stats.temporal_consistency,
            "sequence training finished"
        );
        Ok(TrainingOutcome {
            stats: self.stats.clone(),
            stop_reason,
        })
    }

    /// Runs one optimizer step on `batch` with the learning rate decayed to
    /// global step `step`, and returns the batch loss.
    pub fn train_sequence_step(&mut self, batch: &[SequenceWindow<'_>], step: u64) -> Result<f32, TrainError> {
        train_batch(&mut self.network, &self.config, batch.iter().copied(), step)
    }

    /// Mean-squared loss over the windows of `episodes`; `0` when they yield none.
    pub fn evaluate_sequence(&self, episodes: &[Episode]) -> Result<f32, TrainError> {
        let windows = sequence_windows(episodes, &self.config.window)?;
        let (inputs, targets) = inputs_and_targets(windows);
        Ok(self.network.evaluate(&inputs, &targets)?)
    }

    /// Discrete `[move, energy]` action following a series of states, oldest first.
    pub fn predict_sequence<S>(&self, states: &[S]) -> Result<Action, TrainError>
    where
        S: AsRef<[f32]> + Sync,
    {
        Ok(self.network.predict(&states)?)
    }

    /// Discrete action predicted for the frame after `window`.
    pub fn predict_window(&self, window: SequenceWindow<'_>) -> Result<Action, TrainError> {
        Ok(self.network.predict(&WindowInput(window))?)
    }

    pub fn save_sequence_model(&self, path: &Path) -> Result<(), TrainError> {
        self.network.save(path)?;
        Ok(())
    }

    /// Loads a saved model; on error the current parameters stay in place.
    pub fn load_sequence_model(&mut self, path: &Path) -> Result<(), TrainError> {
        self.network.load(path)?;
        Ok(())
    }
}

fn train_batch<'a, I>(
    network: &mut SequenceNetwork,
    config: &SequenceTrainingConfig,
    batch: I,
    step: u64,
) -> Result<f32, TrainError>
where
    I: IntoIterator<Item = SequenceWindow<'a>>,
{
    let (inputs, targets) = inputs_and_targets(batch);
    Ok(network.train(&inputs, &targets, config.learning_rate_at(step), step)?)
}

/// One training run over a fixed split of windows.
struct SequenceRun<'a> {
    network: &'a mut SequenceNetwork,
    rng: &'a mut Pcg32,
    step: &'a mut u64,
    config: &'a SequenceTrainingConfig,
    windows: &'a [SequenceWindow<'a>],
    train: Vec<usize>,
    /// Ascending, so predictions follow recording order.
    validation: Vec<usize>,
}

impl SequenceRun<'_> {
    fn score(&self, indices: &[usize]) -> Result<(Vec<Vec<f32>>, Vec<Action>), TrainError> {
        let (inputs, targets) = inputs_and_targets(indices.iter().map(|&i| self.windows[i]));
        let predictions = self.network.forward_batch(&inputs)?;
        Ok((predictions, targets))
    }

    fn training_accuracy(&self) -> Result<f32, TrainError> {
        let (predictions, targets) = self.score(&self.train)?;
        Ok(metrics::mean_abs_accuracy(&predictions, &targets))
    }
}

impl EpochModel for SequenceRun<'_> {
    fn train_epoch(&mut self, cancel: &CancelFlag) -> Result<Option<SeriesSummary>, TrainError> {
        self.train.shuffle(self.rng);
        let mut losses = RunningSummary::new();
        for indices in self.train.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let batch = indices.iter().map(|&i| self.windows[i]);
            let loss = train_batch(self.network, self.config, batch, *self.step)?;
            tracing::debug!(
                step = *self.step,
                samples = indices.len(),
                lr = self.config.learning_rate_at(*self.step),
                loss,
                "batch"
            );
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

#[cfg(test)]
mod tests {
    use mimicry_data::{episode::Frame, window::WindowConfig};

    use super::*;
    use crate::StopReason;

    #[expect(clippy::cast_precision_loss)]
    fn episode(len: usize) -> Episode {
        let frames = (0..len)
            .map(|t| {
                let phase = t as f32 / len as f32;
                let state = (0..130).map(|i| (phase + i as f32 * 0.01).sin()).collect();
                let action = if t % 4 < 2 { [1.0, 0.0] } else { [-1.0, 1.0] };
                Frame::new(state, action).unwrap()
            })
            .collect();
        Episode::new(frames)
    }

    fn small_config() -> SequenceTrainingConfig {
        SequenceTrainingConfig {
            epochs: 3,
            window: WindowConfig {
                length: 4,
                stride: 1,
                max_per_episode: 1000,
            },
            hidden1: 4,
            hidden2: 3,
            dense_hidden: 3,
            seed: Some(9),
            ..SequenceTrainingConfig::default()
        }
    }

    #[test]
    fn test_trains_on_windows() {
        let mut trainer = SequenceTrainer::new(small_config()).unwrap();
        // 20 frames, L = 4: 16 windows, 3 validation, 13 training in one batch
        let outcome = trainer.train_from_sequences(&[episode(20)]).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::EpochsExhausted);
        assert_eq!(outcome.stats.epochs_completed, 3);
        assert_eq!(trainer.step(), 3);
        assert!(outcome.stats.temporal_consistency > 0.0);
        assert!(outcome.stats.best_validation_loss.is_some());
    }

    #[test]
    fn test_too_few_windows() {
        let mut trainer = SequenceTrainer::new(small_config()).unwrap();
        assert!(matches!(
            trainer.train_from_sequences(&[episode(5)]),
            Err(TrainError::InsufficientData { samples: 1 })
        ));
        assert!(matches!(
            trainer.train_from_sequences(&[episode(3)]),
            Err(TrainError::InsufficientData { samples: 0 })
        ));
        assert!(matches!(trainer.train_from_sequences(&[]), Err(TrainError::NoTrainingData)));
        assert_eq!(trainer.step(), 0);
    }

    #[test]
    fn test_step_and_evaluate() {
        let mut trainer = SequenceTrainer::new(small_config()).unwrap();
        let episodes = [episode(12)];
        let windows = sequence_windows(&episodes, &trainer.config().window).unwrap();
        let before = trainer.evaluate_sequence(&episodes).unwrap();
        for step in 0..30 {
            trainer.train_sequence_step(&windows, step).unwrap();
        }
        assert!(trainer.evaluate_sequence(&episodes).unwrap() < before);
        assert_eq!(trainer.evaluate_sequence(&[episode(2)]).unwrap(), 0.0);
    }

    #[test]
    fn test_predictions_are_discrete() {
        let trainer = SequenceTrainer::new(small_config()).unwrap();
        let episodes = [episode(8)];
        let window = SequenceWindow::at(&episodes[0], 0, 4).unwrap();
        let action = trainer.predict_window(window).unwrap();
        assert!([-1.0, 0.0, 1.0].contains(&action[0]));
        assert!([0.0, 1.0].contains(&action[1]));

        let states = window.states().collect::<Vec<_>>();
        assert_eq!(trainer.predict_sequence(&states).unwrap(), action);
        let empty: [&[f32]; 0] = [];
        assert!(trainer.predict_sequence(&empty).is_err());
    }
}
