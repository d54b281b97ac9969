//! From-scratch neural networks for behavior cloning
//!
//! This crate implements the numerical core of the training engine without any
//! tensor or automatic-differentiation library: a typed row-major
//! [`Matrix`](matrix::Matrix), per-layer parameters, manual backpropagation,
//! the Adam optimizer and a versioned binary model format.
//!
//! # Networks
//!
//! - [`DenseNetwork`]: feed-forward policy over single frames. The default
//!   behavior-cloning shape is `130 → 256 → 128 → 64 → 32 → 16 → 2` with ReLU
//!   on the hidden layers and a linear output.
//! - [`SequenceNetwork`]: two stacked LSTM layers (`130 → 256 → 128`) over a
//!   window of frames, followed by a dense head (`128 → 64`, ReLU) and a
//!   `tanh`-squashed 2-value output. Trained with full backpropagation
//!   through time.
//!
//! Both networks keep their parameters in a [`ParameterSet`](params::ParameterSet)
//! (one weight matrix and bias vector per layer), which is what the
//! optimizer updates and what [`persist`] reads and writes.
//!
//! # Training Step
//!
//! ```text
//! batch → forward (cached) → MSE loss → backward → gradients / batch size
//!       → Adam (shared step counter) → finite-value check
//! ```
//!
//! A step that leaves a NaN or infinite parameter behind fails with
//! [`NnError::NonFinite`].
//!
//! # Example
//!
//! ```
//! use mimicry_nn::DenseNetwork;
//! use rand::SeedableRng as _;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let mut rng = rand_pcg::Pcg32::seed_from_u64(0);
//! let mut network = DenseNetwork::new(&[4, 8, 2], &mut rng)?;
//!
//! let states = [[0.0, 0.5, 1.0, 0.0]];
//! let actions = [[1.0, 0.0]];
//! let before = network.evaluate(&states, &actions)?;
//! for step in 0..50 {
//!     network.train(&states, &actions, 0.01, step)?;
//! }
//! assert!(network.evaluate(&states, &actions)? < before);
//! # Ok(())
//! # }
//! ```

pub use self::{dense::*, policy::*, sequence::*};

pub mod activation;
pub mod adam;
mod dense;
mod lstm;
pub mod matrix;
mod parallel;
pub mod params;
pub mod persist;
mod policy;
mod sequence;
mod stack;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NnError {
    #[display("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[display("batch has {inputs} inputs but {targets} targets")]
    BatchMismatch { inputs: usize, targets: usize },
    #[display("input sequence is empty")]
    EmptySequence,
    #[display("invalid architecture: {reason}")]
    InvalidArchitecture { reason: &'static str },
    #[display("non-finite parameter in layer {layer} after optimizer step")]
    NonFinite { layer: usize },
}

fn check_width(values: &[f32], expected: usize) -> Result<(), NnError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(NnError::ShapeMismatch {
            expected,
            actual: values.len(),
        })
    }
}
