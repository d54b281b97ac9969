use std::{fs, path::PathBuf};

use anyhow::Context;
use chrono::Utc;
use mimicry_training::{ModelReport, TrainingManager, TrainingMode};

use crate::util::{self, RunConfig};

/// Prefix of the copies `--resume` starts from.
const LATEST_PREFIX: &str = "latest";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Which model to train: traditional, sequence or hybrid
    #[arg(long, default_value = "traditional")]
    pub(crate) mode: TrainingMode,
    /// Demonstrations to train on (.csv or .json)
    #[arg(long)]
    data: PathBuf,
    /// JSON file with `dense` and `sequence` training settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory models, checkpoints and reports are written to
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,
    /// Continue from the latest models in the model directory
    #[arg(long)]
    pub(crate) resume: bool,
    /// Override the number of epochs
    #[arg(long)]
    pub(crate) epochs: Option<usize>,
    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Override the number of gradient worker threads
    #[arg(long)]
    workers: Option<usize>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        mode,
        data,
        config,
        model_dir,
        resume,
        epochs,
        seed,
        workers,
    } = arg;

    let mut config = RunConfig::load(config.as_deref())?;
    let checkpoint_dir = model_dir.join("checkpoints");
    if let Some(epochs) = epochs {
        config.dense.epochs = *epochs;
        config.sequence.epochs = *epochs;
    }
    if let Some(workers) = workers {
        config.dense.workers = *workers;
        config.sequence.workers = *workers;
    }
    if let Some(seed) = seed {
        config.dense.seed = Some(*seed);
        config.sequence.seed = Some(*seed);
    }
    config.dense.checkpoint_dir.get_or_insert_with(|| checkpoint_dir.clone());
    config.sequence.checkpoint_dir.get_or_insert(checkpoint_dir);

    let episodes = util::load_episodes(data)?;
    fs::create_dir_all(model_dir)
        .with_context(|| format!("Failed to create model directory: {}", model_dir.display()))?;

    let mut manager = TrainingManager::new(*mode, model_dir, config.dense, config.sequence)?;
    if *resume {
        let loaded = manager.load_all(LATEST_PREFIX)?;
        if loaded.is_empty() {
            eprintln!("No previous models found, starting from scratch");
        }
        for path in &loaded {
            eprintln!("Resuming from {}", path.display());
        }
    }

    let report = manager.start_training(&episodes)?;

    let prefix = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let saved = manager.save_all(&prefix)?;
    manager.save_all(LATEST_PREFIX)?;
    let report_path = model_dir.join(format!("{prefix}_training_report.json"));
    util::write_report(&report, Some(&report_path))?;

    eprintln!();
    eprintln!("{mode} training completed in {:.1}s", report.elapsed_seconds);
    for (name, model) in [("Traditional", &report.traditional), ("Sequence", &report.sequence)] {
        if let Some(model) = model {
            print_model_summary(name, model);
        }
    }
    eprintln!("  Accuracy: {:.3}", report.accuracy);
    for path in &saved {
        eprintln!("  Model: {}", path.display());
    }
    eprintln!("  Report: {}", report_path.display());

    Ok(())
}

fn print_model_summary(name: &str, model: &ModelReport) {
    let stats = &model.stats;
    eprintln!("  {name}:");
    eprintln!("    Stop reason:          {:?}", model.stop_reason);
    eprintln!("    Epochs:               {}", stats.epochs_completed);
    if let (Some(epoch), Some(loss)) = (stats.best_epoch, stats.best_validation_loss) {
        eprintln!("    Best epoch:           {epoch} (validation loss {loss:.5})");
    }
    eprintln!("    Training accuracy:    {:.3}", stats.training_accuracy);
    eprintln!("    Validation accuracy:  {:.3}", stats.validation_accuracy);
    eprintln!("    Action accuracy:      {:.3}", stats.action_accuracy);
    eprintln!("    Temporal consistency: {:.3}", stats.temporal_consistency);
}
