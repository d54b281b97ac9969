use std::path::PathBuf;

use anyhow::Context;
use mimicry_data::episode::STATE_DIM;
use mimicry_training::DenseTrainer;
use serde::Serialize;

use crate::util::{self, RunConfig};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PredictArg {
    /// Saved dense model file
    #[arg(long)]
    model: PathBuf,
    /// State as a JSON array of 130 numbers
    #[arg(long)]
    state: String,
    /// JSON file with the settings the model was trained with
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Prediction {
    raw: Vec<f32>,
    action: [f32; 2],
}

pub(crate) fn run(arg: &PredictArg) -> anyhow::Result<()> {
    let PredictArg {
        model,
        state,
        config,
    } = arg;

    let state = parse_state(state)?;
    let config = RunConfig::load(config.as_deref())?;
    let mut trainer = DenseTrainer::new(config.dense)?;
    trainer
        .load(model)
        .with_context(|| format!("Failed to load dense model: {}", model.display()))?;

    let prediction = Prediction {
        raw: trainer.network().forward(&state)?,
        action: trainer.predict(&state)?,
    };
    util::write_report(&prediction, None)?;
    Ok(())
}

fn parse_state(text: &str) -> anyhow::Result<Vec<f32>> {
    let state: Vec<f32> = serde_json::from_str(text).context("State must be a JSON array of numbers")?;
    anyhow::ensure!(
        state.len() == STATE_DIM,
        "State must have {STATE_DIM} values, got {}",
        state.len()
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        let text = serde_json::to_string(&vec![0.5_f32; 130]).unwrap();
        assert_eq!(parse_state(&text).unwrap().len(), 130);
        assert!(parse_state("[1.0, 2.0]").is_err());
        assert!(parse_state("not json").is_err());
    }
}
