//! Recorded demonstration samples
//!
//! A demonstration is recorded as an [`Episode`]: the ordered [`Frame`]s of
//! one run, each pairing the observed state with the action the demonstrator
//! took. The last frame of an episode is always terminal.
//!
//! # Data Structure
//!
//! ```text
//! EpisodeCollection
//! └─ episodes: Vec<Episode>
//!     └─ frames: Vec<Frame>
//!         ├─ state   (130 floats, already range-normalized)
//!         ├─ action  ([move, energy])
//!         ├─ reward  (carried through, unused by training)
//!         └─ terminal
//! ```
//!
//! # Serialization
//!
//! ```json
//! {
//!   "episodes": [
//!     { "frames": [ { "state": [0.0, ...], "action": [1.0, 0.0], "reward": 0.0, "terminal": false } ] }
//!   ]
//! }
//! ```
//!
//! Frames are validated while deserializing: a state or action of the wrong
//! length is rejected instead of producing a ragged sample.

use serde::{Deserialize, Serialize};

/// Width of the observed state vector.
pub const STATE_DIM: usize = 130;

/// Width of the action vector (`[move, energy]`).
pub const ACTION_DIM: usize = 2;

/// Action taken at one timestep: `[move, energy]`.
pub type Action = [f32; ACTION_DIM];

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FrameError {
    #[display("state has {actual} values, expected {expected}")]
    StateLength { expected: usize, actual: usize },
    #[display("action has {actual} values, expected {expected}")]
    ActionLength { expected: usize, actual: usize },
}

/// One timestep of a demonstration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    state: Vec<f32>,
    action: Action,
    reward: f32,
    terminal: bool,
}

impl Frame {
    /// Creates a non-terminal frame with zero reward.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::StateLength`] if `state` is not [`STATE_DIM`] wide.
    pub fn new(state: Vec<f32>, action: Action) -> Result<Self, FrameError> {
        if state.len() != STATE_DIM {
            return Err(FrameError::StateLength {
                expected: STATE_DIM,
                actual: state.len(),
            });
        }
        Ok(Self {
            state,
            action,
            reward: 0.0,
            terminal: false,
        })
    }

    #[must_use]
    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub fn state(&self) -> &[f32] {
        &self.state
    }

    /// Mutable access to the state values; the width cannot change.
    pub fn state_mut(&mut self) -> &mut [f32] {
        &mut self.state
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn reward(&self) -> f32 {
        self.reward
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[derive(Deserialize)]
struct RawFrame {
    state: Vec<f32>,
    action: Vec<f32>,
    #[serde(default)]
    reward: f32,
    #[serde(default)]
    terminal: bool,
}

impl TryFrom<RawFrame> for Frame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        let action: Action =
            raw.action
                .as_slice()
                .try_into()
                .map_err(|_| FrameError::ActionLength {
                    expected: ACTION_DIM,
                    actual: raw.action.len(),
                })?;
        let mut frame = Frame::new(raw.state, action)?.with_reward(raw.reward);
        frame.terminal = raw.terminal;
        Ok(frame)
    }
}

/// One recorded run: frames in time order, the last one terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEpisode")]
pub struct Episode {
    frames: Vec<Frame>,
}

#[derive(Deserialize)]
struct RawEpisode {
    frames: Vec<Frame>,
}

impl From<RawEpisode> for Episode {
    fn from(raw: RawEpisode) -> Self {
        Episode::new(raw.frames)
    }
}

impl Episode {
    /// Creates an episode, marking the last frame terminal.
    #[must_use]
    pub fn new(mut frames: Vec<Frame>) -> Self {
        if let Some(last) = frames.last_mut() {
            last.terminal = true;
        }
        Self { frames }
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Problems that make a dataset unusable for training.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("dataset contains no episodes")]
    NoEpisodes,
    #[display("episode {index} contains no frames")]
    EmptyEpisode { index: usize },
}

/// Collection of recorded episodes, the on-disk JSON form of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeCollection {
    pub episodes: Vec<Episode>,
}

impl EpisodeCollection {
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.episodes.iter().map(Episode::len).sum()
    }

    /// Iterates over every frame of every episode, in order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.episodes.iter().flat_map(Episode::frames)
    }

    /// Checks that the collection holds at least one episode and no empty one.
    pub fn validate(&self) -> Result<(), DatasetError> {
        validate_episodes(&self.episodes)
    }
}

/// Checks that `episodes` is non-empty and that every episode has frames.
pub fn validate_episodes(episodes: &[Episode]) -> Result<(), DatasetError> {
    if episodes.is_empty() {
        return Err(DatasetError::NoEpisodes);
    }
    if let Some(index) = episodes.iter().position(Episode::is_empty) {
        return Err(DatasetError::EmptyEpisode { index });
    }
    Ok(())
}
