//! Train/validation partitioning
//!
//! [`Splitter::split`] shuffles the input with a caller-supplied random
//! source and puts the first `round(N · fraction)` shuffled samples into the
//! validation set and the rest into the training set. The two partitions are
//! disjoint and together contain every input sample exactly once.
//!
//! Inputs larger than [`Splitter::chunk_threshold`] are never shuffled as a
//! whole: only an index permutation is shuffled, and the samples are gathered
//! into the partitions a bounded chunk at a time. Sequence windows are
//! borrowed views, so splitting them copies references, never frame data.

use rand::{Rng, seq::SliceRandom as _};

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("validation fraction must be within [0, 1], got {fraction}")]
pub struct SplitError {
    fraction: f32,
}

/// The two partitions produced by [`Splitter::split`].
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    validation_fraction: f32,
    chunk_threshold: usize,
    chunk_size: usize,
}

impl Splitter {
    pub const DEFAULT_CHUNK_THRESHOLD: usize = 10_000;
    pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

    pub fn new(validation_fraction: f32) -> Result<Self, SplitError> {
        if !(0.0..=1.0).contains(&validation_fraction) {
            return Err(SplitError {
                fraction: validation_fraction,
            });
        }
        Ok(Self {
            validation_fraction,
            chunk_threshold: Self::DEFAULT_CHUNK_THRESHOLD,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        })
    }

    /// Sets the input size above which samples are gathered in chunks, and the chunk size.
    #[must_use]
    pub fn with_chunking(mut self, threshold: usize, chunk_size: usize) -> Self {
        self.chunk_threshold = threshold;
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn validation_fraction(&self) -> f32 {
        self.validation_fraction
    }

    #[must_use]
    pub fn chunk_threshold(&self) -> usize {
        self.chunk_threshold
    }

    /// Number of validation samples for an input of `len` samples.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn validation_size(&self, len: usize) -> usize {
        let size = (len as f64 * f64::from(self.validation_fraction)).round() as usize;
        size.min(len)
    }

    pub fn split<T, R>(&self, data: &[T], rng: &mut R) -> Split<T>
    where
        T: Clone,
        R: Rng + ?Sized,
    {
        let validation_size = self.validation_size(data.len());
        if data.len() <= self.chunk_threshold {
            let mut shuffled = data.to_vec();
            shuffled.shuffle(rng);
            let train = shuffled.split_off(validation_size);
            return Split {
                train,
                validation: shuffled,
            };
        }

        let mut indices = (0..data.len()).collect::<Vec<_>>();
        indices.shuffle(rng);
        let mut validation = Vec::with_capacity(validation_size);
        let mut train = Vec::with_capacity(data.len() - validation_size);
        for (chunk_index, chunk) in indices.chunks(self.chunk_size).enumerate() {
            tracing::debug!(chunk = chunk_index, samples = chunk.len(), "gathering split chunk");
            for &index in chunk {
                let sample = data[index].clone();
                if validation.len() < validation_size {
                    validation.push(sample);
                } else {
                    train.push(sample);
                }
            }
        }
        Split { train, validation }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn check_partition(split: &Split<u32>, len: u32) {
        let train = split.train.iter().copied().collect::<HashSet<_>>();
        let validation = split.validation.iter().copied().collect::<HashSet<_>>();
        assert!(train.is_disjoint(&validation));
        let union = train.union(&validation).copied().collect::<HashSet<_>>();
        assert_eq!(union, (0..len).collect::<HashSet<_>>());
        assert_eq!(split.train.len() + split.validation.len(), len as usize);
    }

    #[test]
    fn test_split_ratio_and_partition() {
        let data = (0..1000).collect::<Vec<u32>>();
        let mut rng = Pcg32::seed_from_u64(42);
        let split = Splitter::new(0.2).unwrap().split(&data, &mut rng);
        assert!(split.validation.len().abs_diff(200) <= 1);
        check_partition(&split, 1000);
    }

    #[test]
    fn test_chunked_split_ratio_and_partition() {
        let data = (0..1000).collect::<Vec<u32>>();
        let mut rng = Pcg32::seed_from_u64(42);
        let splitter = Splitter::new(0.2).unwrap().with_chunking(100, 64);
        let split = splitter.split(&data, &mut rng);
        assert!(split.validation.len().abs_diff(200) <= 1);
        check_partition(&split, 1000);
    }

    #[test]
    fn test_split_shuffles() {
        let data = (0..1000).collect::<Vec<u32>>();
        let mut rng = Pcg32::seed_from_u64(1);
        let split = Splitter::new(0.2).unwrap().split(&data, &mut rng);
        assert_ne!(split.validation, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let data = (0..50).collect::<Vec<u32>>();
        let splitter = Splitter::new(0.3).unwrap();
        let a = splitter.split(&data, &mut Pcg32::seed_from_u64(9));
        let b = splitter.split(&data, &mut Pcg32::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_extreme_fractions() {
        let data = (0..10).collect::<Vec<u32>>();
        let mut rng = Pcg32::seed_from_u64(3);
        let all_train = Splitter::new(0.0).unwrap().split(&data, &mut rng);
        assert!(all_train.validation.is_empty());
        let all_validation = Splitter::new(1.0).unwrap().split(&data, &mut rng);
        assert!(all_validation.train.is_empty());
        assert_eq!(all_validation.validation.len(), 10);
    }

    #[test]
    fn test_fraction_out_of_range_is_rejected() {
        assert!(Splitter::new(-0.1).is_err());
        assert!(Splitter::new(1.5).is_err());
        assert!(Splitter::new(f32::NAN).is_err());
    }

    #[test]
    fn test_empty_input() {
        let data: Vec<u32> = vec![];
        let split = Splitter::new(0.2)
            .unwrap()
            .split(&data, &mut Pcg32::seed_from_u64(0));
        assert!(split.train.is_empty());
        assert!(split.validation.is_empty());
    }
}
