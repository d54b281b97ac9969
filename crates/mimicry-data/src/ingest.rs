//! Reading recorded demonstrations from disk
//!
//! Two formats are accepted:
//!
//! - **CSV**: one recording per file. The first record is a header; every
//!   following record holds at least 132 numbers: the 130 state values, then
//!   `action_x` and `use_energy`. Extra trailing columns are ignored. Fields
//!   may be quoted. All rows form a single [`Episode`] whose last frame is
//!   terminal.
//! - **JSON**: a serialized [`EpisodeCollection`].
//!
//! [`load_episodes`] picks the format from the file extension (`.json`, or
//! CSV otherwise).

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use crate::episode::{ACTION_DIM, Episode, EpisodeCollection, Frame, FrameError, STATE_DIM};

/// Minimum number of values in a CSV row.
pub const CSV_ROW_WIDTH: usize = STATE_DIM + ACTION_DIM;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum IngestError {
    #[display("failed to open {}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[display("failed to read CSV record")]
    Csv { source: csv::Error },
    #[display("line {line}, column {column}: invalid number {value:?}")]
    Parse {
        line: u64,
        column: usize,
        value: String,
    },
    #[display("line {line}: invalid frame")]
    Frame { line: u64, source: FrameError },
    #[display("failed to parse {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads one CSV recording.
///
/// Fields may be quoted and padded with whitespace. Rows with fewer than
/// [`CSV_ROW_WIDTH`] values are skipped with a warning, and values past
/// [`CSV_ROW_WIDTH`] are not parsed. Line numbers in errors are 1-based and
/// count the header.
pub fn read_csv<R>(reader: R) -> Result<Episode, IngestError>
where
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut frames = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv { source })?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.len() < CSV_ROW_WIDTH {
            tracing::warn!(line, values = record.len(), expected = CSV_ROW_WIDTH, "skipping short row");
            continue;
        }

        let mut values = parse_record(&record, line)?;
        let action = [values[STATE_DIM], values[STATE_DIM + 1]];
        values.truncate(STATE_DIM);
        let frame = Frame::new(values, action).map_err(|source| IngestError::Frame { line, source })?;
        frames.push(frame);
    }
    Ok(Episode::new(frames))
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<Vec<f32>, IngestError> {
    record
        .iter()
        .take(CSV_ROW_WIDTH)
        .enumerate()
        .map(|(column, field)| {
            field.parse::<f32>().map_err(|_| IngestError::Parse {
                line,
                column: column + 1,
                value: field.to_owned(),
            })
        })
        .collect()
}

/// Loads a CSV recording as a single episode.
pub fn load_csv(path: &Path) -> Result<Episode, IngestError> {
    let file = open(path)?;
    let episode = read_csv(file)?;
    tracing::info!(path = %path.display(), frames = episode.len(), "loaded CSV recording");
    Ok(episode)
}

/// Loads a JSON [`EpisodeCollection`].
pub fn load_json(path: &Path) -> Result<EpisodeCollection, IngestError> {
    let file = open(path)?;
    let collection: EpisodeCollection = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| IngestError::Json {
            path: path.to_owned(),
            source,
        })?;
    tracing::info!(
        path = %path.display(),
        episodes = collection.episodes.len(),
        frames = collection.total_frames(),
        "loaded episode collection"
    );
    Ok(collection)
}

/// Loads episodes from a `.json` collection or a CSV recording.
pub fn load_episodes(path: &Path) -> Result<Vec<Episode>, IngestError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(load_json(path)?.episodes)
    } else {
        Ok(vec![load_csv(path)?])
    }
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Open {
        path: path.to_owned(),
        source,
    })
}
