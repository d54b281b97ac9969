//! Demonstration data for behavior-cloning training
//!
//! This crate owns everything the trainers need to know about recorded
//! demonstrations before any network is involved: the sample types, how
//! recordings are read from disk, how episodes are cut into fixed-length
//! windows for the sequence model, and how a dataset is split into training
//! and validation partitions.
//!
//! # Overview
//!
//! ```text
//! CSV / JSON recording
//!     ↓ ingest
//! Episode (Vec<Frame>, last frame terminal)
//!     ↓ window (sequence model only)
//! SequenceWindow (borrowed view into an Episode)
//!     ↓ split
//! Split { train, validation }
//! ```
//!
//! # Modules
//!
//! - [`episode`]: [`Frame`](episode::Frame), [`Episode`](episode::Episode) and
//!   [`EpisodeCollection`](episode::EpisodeCollection)
//! - [`window`]: Sliding-window extraction of [`SequenceWindow`](window::SequenceWindow)s
//! - [`split`]: Shuffled train/validation partitioning, chunked for large inputs
//! - [`ingest`]: CSV and JSON readers
//! - [`augment`]: Gaussian input-noise augmentation
//! - [`thin`]: Thinning of long idle stretches
//! - [`importance`]: Per-feature correlation with the recorded move action
//!
//! # Examples
//!
//! ```
//! use mimicry_data::{
//!     episode::{Episode, Frame, STATE_DIM},
//!     split::Splitter,
//!     window::{WindowConfig, sequence_windows},
//! };
//! use rand::SeedableRng as _;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let frames = (0..40)
//!     .map(|i| Frame::new(vec![0.0; STATE_DIM], [i as f32 / 40.0, 0.0]))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let episodes = vec![Episode::new(frames)];
//!
//! let config = WindowConfig { length: 10, stride: 5, ..WindowConfig::default() };
//! let windows = sequence_windows(&episodes, &config)?;
//! assert_eq!(windows.len(), 6);
//!
//! let mut rng = rand_pcg::Pcg32::seed_from_u64(7);
//! let split = Splitter::new(0.5)?.split(&windows, &mut rng);
//! assert_eq!(split.validation.len(), 3);
//! assert_eq!(split.train.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod augment;
pub mod episode;
pub mod importance;
pub mod ingest;
pub mod split;
pub mod thin;
pub mod window;
