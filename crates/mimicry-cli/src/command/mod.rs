use clap::{Parser, Subcommand};

use self::{
    evaluate::EvaluateArg, feature_importance::FeatureImportanceArg, predict::PredictArg,
    train::TrainArg,
};

mod evaluate;
mod feature_importance;
mod predict;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train the dense model, the sequence model or both on recorded demonstrations
    Train(#[clap(flatten)] TrainArg),
    /// Report the loss of a saved model on recorded demonstrations
    Evaluate(#[clap(flatten)] EvaluateArg),
    /// Predict the action for a single state with a saved dense model
    Predict(#[clap(flatten)] PredictArg),
    /// Rank state features by their correlation with the movement action
    FeatureImportance(#[clap(flatten)] FeatureImportanceArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
        Mode::Predict(arg) => predict::run(&arg)?,
        Mode::FeatureImportance(arg) => feature_importance::run(&arg)?,
    }
    Ok(())
}
