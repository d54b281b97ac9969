//! Thinning of idle stretches
//!
//! Recordings tend to contain long runs of frames where the player does
//! nothing (action `[0, 0]`). Left as-is they dominate the loss and teach the
//! policy to stand still. [`thin_idle_runs`] keeps the first
//! [`IdleThinning::max_run`] frames of every idle run and then only every
//! [`IdleThinning::keep_interval`]-th frame of the rest.
//!
//! ```
//! use mimicry_data::{
//!     episode::{Episode, Frame, STATE_DIM},
//!     thin::{IdleThinning, thin_idle_runs},
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let frames = (0..20)
//!     .map(|_| Frame::new(vec![0.0; STATE_DIM], [0.0, 0.0]))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let thinning = IdleThinning { max_run: 10, keep_interval: 5 };
//! let thinned = thin_idle_runs(&Episode::new(frames), &thinning)?;
//! // 10 kept outright, then frames 10 and 15 of the run
//! assert_eq!(thinned.len(), 12);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::episode::{Episode, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("idle thinning keep_interval must be at least 1")]
pub struct ThinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleThinning {
    /// Idle frames kept at the start of every run.
    pub max_run: usize,
    /// Past `max_run`, one idle frame in this many is kept.
    pub keep_interval: usize,
}

impl Default for IdleThinning {
    fn default() -> Self {
        Self {
            max_run: 10,
            keep_interval: 5,
        }
    }
}

impl IdleThinning {
    pub fn validate(&self) -> Result<(), ThinError> {
        if self.keep_interval == 0 {
            return Err(ThinError);
        }
        Ok(())
    }

    fn keeps(&self, run_position: usize) -> bool {
        run_position < self.max_run || (run_position - self.max_run) % self.keep_interval == 0
    }
}

fn is_idle(frame: &Frame) -> bool {
    frame.action() == [0.0, 0.0]
}

/// Returns `episode` with its long idle runs thinned out.
///
/// Frames with any non-zero action are always kept, and the result's last
/// frame is terminal.
pub fn thin_idle_runs(episode: &Episode, thinning: &IdleThinning) -> Result<Episode, ThinError> {
    thinning.validate()?;
    let mut run_position = 0;
    let frames = episode
        .frames()
        .iter()
        .filter(|frame| {
            if !is_idle(frame) {
                run_position = 0;
                return true;
            }
            let keep = thinning.keeps(run_position);
            run_position += 1;
            keep
        })
        .cloned()
        .collect::<Vec<_>>();

    let removed = episode.len() - frames.len();
    if removed > 0 {
        tracing::debug!(frames = episode.len(), removed, "thinned idle runs");
    }
    Ok(Episode::new(frames))
}
