use std::path::PathBuf;

use mimicry_data::importance;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FeatureImportanceArg {
    /// Demonstrations to analyze (.csv or .json)
    #[arg(long)]
    data: PathBuf,
    /// Number of features to report
    #[arg(long, default_value_t = 20)]
    top: usize,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &FeatureImportanceArg) -> anyhow::Result<()> {
    let FeatureImportanceArg { data, top, output } = arg;

    let episodes = util::load_episodes(data)?;
    let mut ranking = importance::feature_importance(&episodes);
    ranking.truncate(*top);

    eprintln!("Top {} features by |correlation| with movement:", ranking.len());
    for (rank, feature) in ranking.iter().enumerate() {
        eprintln!(
            "  {:3}. {:12} importance {:.4} (correlation {:+.4})",
            rank + 1,
            feature.name,
            feature.importance,
            feature.correlation
        );
    }
    util::write_report(&ranking, output.as_deref())?;
    Ok(())
}
