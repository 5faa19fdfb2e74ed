//! Accumulates per-pattern errors into one error for a training iteration.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Reported by `IterationError::total_error` before any pattern was seen.
pub const WORST_ERROR: f64 = f64::MAX;

#[derive(Debug, Default)]
struct Totals {
    sum: f64,
    count: usize,
}

/// A running mean of per-pattern errors, safe to feed from several gradient
/// tasks at once.
#[derive(Debug, Default)]
pub struct IterationError {
    totals: Mutex<Totals>,
}

impl IterationError {
    pub fn new() -> Self {
        IterationError::default()
    }

    fn totals(&self) -> MutexGuard<'_, Totals> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one pattern's error vector as the mean of its squared
    /// components.
    pub fn add_errors(&self, errors: &[f64]) {
        self.add(mean_square(errors));
    }

    /// Records one pattern's scalar error.
    pub fn add(&self, error: f64) {
        let mut totals = self.totals();
        totals.sum += error;
        totals.count += 1;
    }

    /// Adds everything recorded by `other`, as if its patterns had been
    /// recorded here.
    pub fn merge(&self, other: &IterationError) {
        let (sum, count) = {
            let other = other.totals();
            (other.sum, other.count)
        };
        let mut totals = self.totals();
        totals.sum += sum;
        totals.count += count;
    }

    /// The mean of every recorded error, or `WORST_ERROR` when nothing has
    /// been recorded since the last reset.
    pub fn total_error(&self) -> f64 {
        let totals = self.totals();
        if totals.count == 0 {
            WORST_ERROR
        } else {
            totals.sum / totals.count as f64
        }
    }

    /// The number of patterns recorded since the last reset.
    pub fn count(&self) -> usize {
        self.totals().count
    }

    pub fn reset(&self) {
        *self.totals() = Totals::default();
    }
}

/// Computes the mean of the squared components of `errors`.
pub fn mean_square(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64
}
