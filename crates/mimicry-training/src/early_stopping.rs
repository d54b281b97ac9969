//! Patience-based early stopping on validation loss.
//!
//! [`EarlyStopping::observe`] is fed the validation loss once per epoch. A
//! loss lower than the best so far by more than `min_delta` is a new best and
//! resets the patience counter; anything else (including a NaN loss)
//! increments it. When the counter reaches `patience` the run should stop.
//!
//! ```
//! use mimicry_training::early_stopping::{EarlyStopping, StoppingDecision};
//!
//! let mut stopping = EarlyStopping::new(2, 1e-4);
//! assert_eq!(stopping.observe(0, 1.0), StoppingDecision::NewBest);
//! assert_eq!(
//!     stopping.observe(1, 1.0),
//!     StoppingDecision::NoImprovement { count: 1, remaining: 1 }
//! );
//! assert_eq!(stopping.observe(2, 1.0), StoppingDecision::Stop);
//! assert_eq!(stopping.best_epoch(), Some(0));
//! ```

/// Outcome of observing one epoch's validation loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingDecision {
    /// The loss improved; the current parameters are the new best checkpoint.
    NewBest,
    /// No improvement, but patience is not exhausted yet.
    NoImprovement { count: usize, remaining: usize },
    /// Patience exhausted.
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best_loss: Option<f32>,
    best_epoch: Option<usize>,
    counter: usize,
}

impl EarlyStopping {
    #[must_use]
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: None,
            best_epoch: None,
            counter: 0,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f32) -> StoppingDecision {
        let improved = match self.best_loss {
            None => !loss.is_nan(),
            Some(best) => loss < best - self.min_delta,
        };
        if improved {
            self.best_loss = Some(loss);
            self.best_epoch = Some(epoch);
            self.counter = 0;
            return StoppingDecision::NewBest;
        }

        self.counter += 1;
        if self.counter >= self.patience {
            StoppingDecision::Stop
        } else {
            StoppingDecision::NoImprovement {
                count: self.counter,
                remaining: self.patience - self.counter,
            }
        }
    }

    #[must_use]
    pub fn best_loss(&self) -> Option<f32> {
        self.best_loss
    }

    #[must_use]
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Consecutive epochs without improvement.
    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_exactly_at_patience_without_improvement() {
        let patience = 5;
        let mut stopping = EarlyStopping::new(patience, 1e-4);
        let mut stopped_at = None;
        for epoch in 0..100 {
            if stopping.observe(epoch, 0.5) == StoppingDecision::Stop {
                stopped_at = Some(epoch);
                break;
            }
        }
        assert_eq!(stopped_at, Some(patience));
        assert_eq!(stopping.best_epoch(), Some(0));
        assert_eq!(stopping.best_loss(), Some(0.5));
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut stopping = EarlyStopping::new(3, 0.0);
        stopping.observe(0, 1.0);
        stopping.observe(1, 1.5);
        stopping.observe(2, 1.2);
        assert_eq!(stopping.counter(), 2);
        assert_eq!(stopping.observe(3, 0.9), StoppingDecision::NewBest);
        assert_eq!(stopping.counter(), 0);
        assert_eq!(stopping.best_epoch(), Some(3));
    }

    #[test]
    fn test_min_delta_filters_small_improvements() {
        let mut stopping = EarlyStopping::new(10, 0.1);
        stopping.observe(0, 1.0);
        assert_eq!(
            stopping.observe(1, 0.95),
            StoppingDecision::NoImprovement {
                count: 1,
                remaining: 9
            }
        );
        assert_eq!(stopping.observe(2, 0.85), StoppingDecision::NewBest);
    }

    #[test]
    fn test_nan_is_never_an_improvement() {
        let mut stopping = EarlyStopping::new(2, 1e-4);
        assert_ne!(stopping.observe(0, f32::NAN), StoppingDecision::NewBest);
        assert_eq!(stopping.best_epoch(), None);
        assert_eq!(stopping.observe(1, 0.3), StoppingDecision::NewBest);
        assert_ne!(stopping.observe(2, f32::NAN), StoppingDecision::NewBest);
        assert_eq!(stopping.best_loss(), Some(0.3));
    }

    #[test]
    fn test_zero_patience_stops_on_first_stall() {
        let mut stopping = EarlyStopping::new(0, 0.0);
        assert_eq!(stopping.observe(0, 1.0), StoppingDecision::NewBest);
        assert_eq!(stopping.observe(1, 1.0), StoppingDecision::Stop);
    }
}
