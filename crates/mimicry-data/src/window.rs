//! Fixed-length sequence windows for the recurrent model
//!
//! The sequence model consumes `L` consecutive frames and predicts the action
//! taken at the frame right after them. Windows are cut from each episode by
//! sliding a window of length `L` with a configurable stride:
//!
//! ```text
//! episode:  f0 f1 f2 f3 f4 f5 f6 f7 f8 f9        (L = 4, stride = 2)
//! window 0: [f0 f1 f2 f3] -> target f4
//! window 1:       [f2 f3 f4 f5] -> target f6
//! window 2:             [f4 f5 f6 f7] -> target f8
//! ```
//!
//! A [`SequenceWindow`] borrows its frames from the episode, so building tens
//! of thousands of windows does not copy any state data. Episodes with fewer
//! than `L + 1` frames produce no window.

use serde::{Deserialize, Serialize};

use crate::episode::{Action, Episode, Frame};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum WindowError {
    #[display("window length must be at least 1")]
    ZeroLength,
    #[display("window stride must be at least 1")]
    ZeroStride,
}

/// How windows are cut from an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of frames fed to the network per window.
    pub length: usize,
    /// Distance between the first frames of consecutive windows.
    pub stride: usize,
    /// Upper bound on windows taken from a single episode.
    pub max_per_episode: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: 150,
            stride: 10,
            max_per_episode: 1000,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.length == 0 {
            return Err(WindowError::ZeroLength);
        }
        if self.stride == 0 {
            return Err(WindowError::ZeroStride);
        }
        Ok(())
    }
}

/// `L` consecutive frames of an episode plus the frame that follows them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceWindow<'a> {
    frames: &'a [Frame],
    target: &'a Frame,
}

impl<'a> SequenceWindow<'a> {
    /// Takes the window starting at `start`, or `None` if the episode has no
    /// frame at `start + length`.
    #[must_use]
    pub fn at(episode: &'a Episode, start: usize, length: usize) -> Option<Self> {
        let frames = episode.frames();
        let end = start.checked_add(length)?;
        let target = frames.get(end)?;
        Some(Self {
            frames: &frames[start..end],
            target,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frames(&self) -> &'a [Frame] {
        self.frames
    }

    /// State vectors of the window, in time order.
    pub fn states(&self) -> impl ExactSizeIterator<Item = &'a [f32]> + 'a {
        self.frames.iter().map(Frame::state)
    }

    /// Actions taken inside the window, in time order.
    pub fn actions(&self) -> impl ExactSizeIterator<Item = Action> + 'a {
        self.frames.iter().map(Frame::action)
    }

    /// The action taken right after the window, which the model learns to predict.
    #[must_use]
    pub fn target_action(&self) -> Action {
        self.target.action()
    }
}

/// Iterates over the windows of one episode.
///
/// Starts are `0, stride, 2·stride, ...` while `start < len - L`, capped at
/// `config.max_per_episode` windows.
pub fn episode_windows<'a>(
    episode: &'a Episode,
    config: &WindowConfig,
) -> Result<impl Iterator<Item = SequenceWindow<'a>> + 'a, WindowError> {
    config.validate()?;
    let length = config.length;
    let starts = (0..episode.len().saturating_sub(length))
        .step_by(config.stride)
        .take(config.max_per_episode);
    Ok(starts.filter_map(move |start| SequenceWindow::at(episode, start, length)))
}

/// Collects the windows of all episodes, episode by episode.
pub fn sequence_windows<'a>(
    episodes: &'a [Episode],
    config: &WindowConfig,
) -> Result<Vec<SequenceWindow<'a>>, WindowError> {
    let mut windows = Vec::new();
    for episode in episodes {
        windows.extend(episode_windows(episode, config)?);
    }
    Ok(windows)
}
