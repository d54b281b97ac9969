use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use mimicry_data::{episode::Episode, ingest};
use mimicry_training::config::{SequenceTrainingConfig, TrainingConfig};
use serde::{Deserialize, Serialize};

/// Configuration file shared by the commands that build trainers.
///
/// Both sections are optional; missing values take the library defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub dense: TrainingConfig,
    pub sequence: SequenceTrainingConfig,
}

impl RunConfig {
    /// Reads a run configuration, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let file = File::open(path)
            .with_context(|| format!("Failed to open training config: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse training config: {}", path.display()))
    }
}

/// Reads demonstrations from a CSV recording or a JSON episode collection.
pub fn load_episodes(path: &Path) -> anyhow::Result<Vec<Episode>> {
    let episodes = ingest::load_episodes(path)
        .with_context(|| format!("Failed to load demonstrations: {}", path.display()))?;
    let frames = episodes.iter().map(Episode::len).sum::<usize>();
    eprintln!(
        "Loaded {} episodes ({frames} frames) from {}",
        episodes.len(),
        path.display()
    );
    Ok(episodes)
}

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
///
/// Missing parent directories of `path` are created.
pub fn write_report<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: Serialize,
{
    let Some(path) = path else {
        return write_json(io::stdout().lock(), value).context("Failed to write report to stdout");
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create report: {}", path.display()))?;
    write_json(BufWriter::new(file), value).with_context(|| format!("Failed to write report: {}", path.display()))
}

fn write_json<W, T>(mut writer: W, value: &T) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
