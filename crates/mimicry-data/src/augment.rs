//! Input-noise augmentation
//!
//! Produces jittered copies of frames by adding zero-mean Gaussian noise to
//! every state value. Actions, rewards and terminal flags are copied as-is.

use rand::Rng;
use rand_distr::Normal;

use crate::episode::Frame;

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("noise standard deviation must be finite and non-negative, got {std_dev}")]
pub struct AugmentError {
    std_dev: f32,
}

/// Returns a copy of `frames` with `N(0, std_dev)` noise added to each state value.
///
/// A standard deviation of zero returns unchanged copies.
pub fn with_state_noise<R>(
    frames: &[Frame],
    std_dev: f32,
    rng: &mut R,
) -> Result<Vec<Frame>, AugmentError>
where
    R: Rng + ?Sized,
{
    let normal = Normal::new(0.0, std_dev).map_err(|_| AugmentError { std_dev })?;
    Ok(frames
        .iter()
        .map(|frame| {
            let mut noisy = frame.clone();
            for value in noisy.state_mut() {
                *value += rng.sample(normal);
            }
            noisy
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::episode::STATE_DIM;

    #[test]
    fn test_noise_perturbs_state_only() {
        let frames = vec![Frame::new(vec![0.5; STATE_DIM], [1.0, 0.0]).unwrap()];
        let mut rng = Pcg32::seed_from_u64(0);
        let noisy = with_state_noise(&frames, 0.01, &mut rng).unwrap();
        assert_eq!(noisy.len(), 1);
        assert_eq!(noisy[0].action(), [1.0, 0.0]);
        assert_ne!(noisy[0].state(), frames[0].state());
        assert!(noisy[0].state().iter().all(|v| (v - 0.5).abs() < 0.1));
    }

    #[test]
    fn test_zero_noise_copies() {
        let frames = vec![Frame::new(vec![0.25; STATE_DIM], [0.0, 1.0]).unwrap()];
        let mut rng = Pcg32::seed_from_u64(0);
        assert_eq!(with_state_noise(&frames, 0.0, &mut rng).unwrap(), frames);
    }

    #[test]
    fn test_negative_noise_is_rejected() {
        let mut rng = Pcg32::seed_from_u64(0);
        assert!(with_state_noise(&[], -1.0, &mut rng).is_err());
    }
}
