use std::{panic, thread};

use crate::params::ParameterSet;

/// Gradient and loss sums accumulated over part of a batch.
#[derive(Debug, Clone)]
pub(crate) struct GradientSum {
    pub(crate) grads: ParameterSet,
    pub(crate) loss: f32,
}

impl GradientSum {
    pub(crate) fn zeros_like(params: &ParameterSet) -> Self {
        Self {
            grads: params.zeros_like(),
            loss: 0.0,
        }
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.grads.add_assign(&other.grads);
        self.loss += other.loss;
    }

    /// Divides the sums by the number of samples; an empty batch stays zero.
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn into_mean(mut self, samples: usize) -> (f32, ParameterSet) {
        if samples == 0 {
            return (0.0, self.grads);
        }
        let scale = 1.0 / samples as f32;
        self.grads.scale(scale);
        (self.loss * scale, self.grads)
    }
}

/// Folds `0..len` into accumulators, one per worker, then reduces them.
///
/// Indices are split into contiguous chunks; each worker folds its chunk
/// into a private accumulator created by `init`. Accumulators are reduced in
/// chunk order, so the result only depends on `workers`, not on scheduling.
/// With one worker (or fewer than two items) everything runs on the calling
/// thread.
pub(crate) fn fold_chunks<A, I, F, R>(len: usize, workers: usize, init: I, fold: F, mut reduce: R) -> A
where
    A: Send,
    I: Fn() -> A + Sync,
    F: Fn(&mut A, usize) + Sync,
    R: FnMut(&mut A, A),
{
    let workers = workers.clamp(1, len.max(1));
    if workers == 1 {
        let mut acc = init();
        for index in 0..len {
            fold(&mut acc, index);
        }
        return acc;
    }

    let chunk_size = len.div_ceil(workers);
    let parts = thread::scope(|s| {
        let handles = (0..len)
            .step_by(chunk_size)
            .map(|start| {
                let end = usize::min(start + chunk_size, len);
                let init = &init;
                let fold = &fold;
                s.spawn(move || {
                    let mut acc = init();
                    for index in start..end {
                        fold(&mut acc, index);
                    }
                    acc
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect::<Vec<_>>()
    });

    let mut parts = parts.into_iter();
    let Some(mut acc) = parts.next() else {
        return init();
    };
    for part in parts {
        reduce(&mut acc, part);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_sequential_sum() {
        for workers in [1, 2, 3, 8, 100] {
            let total = fold_chunks(
                10,
                workers,
                Vec::new,
                |acc: &mut Vec<usize>, i| acc.push(i),
                |acc, part| acc.extend(part),
            );
            assert_eq!(total, (0..10).collect::<Vec<_>>(), "workers = {workers}");
        }
    }

    #[test]
    fn test_empty_input() {
        let total = fold_chunks(0, 4, || 0_usize, |acc, i| *acc += i, |acc, part| *acc += part);
        assert_eq!(total, 0);
    }
}
