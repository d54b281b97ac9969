use std::path::PathBuf;

use anyhow::Context;
use mimicry_training::{DenseTrainer, SequenceTrainer};
use serde::Serialize;

use crate::util::{self, RunConfig};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Saved model file
    #[arg(long)]
    model: PathBuf,
    /// Demonstrations to evaluate on (.csv or .json)
    #[arg(long)]
    data: PathBuf,
    /// Evaluate a sequence model instead of a dense one
    #[arg(long)]
    sequence: bool,
    /// JSON file with the settings the model was trained with
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EvaluationReport {
    model: PathBuf,
    data: PathBuf,
    kind: &'static str,
    loss: f32,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        model,
        data,
        sequence,
        config,
        output,
    } = arg;

    let config = RunConfig::load(config.as_deref())?;
    let episodes = util::load_episodes(data)?;

    let (kind, loss) = if *sequence {
        let mut trainer = SequenceTrainer::new(config.sequence)?;
        trainer
            .load_sequence_model(model)
            .with_context(|| format!("Failed to load sequence model: {}", model.display()))?;
        ("sequence", trainer.evaluate_sequence(&episodes)?)
    } else {
        let mut trainer = DenseTrainer::new(config.dense)?;
        trainer
            .load(model)
            .with_context(|| format!("Failed to load dense model: {}", model.display()))?;
        ("dense", trainer.evaluate(&episodes)?)
    };

    eprintln!("{kind} model loss: {loss:.6}");
    let report = EvaluationReport {
        model: model.clone(),
        data: data.clone(),
        kind,
        loss,
    };
    util::write_report(&report, output.as_deref())?;
    Ok(())
}
