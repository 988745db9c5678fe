//! Running signal energy over a sliding window

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use super::sample::Sample;

/// Sum of |x|² over the most recent `len` samples
///
/// The sum is updated incrementally and recomputed from the history once per
/// window length so float round-off cannot accumulate.
pub struct RunningEnergy {
    history: HeapRb<f32>,
    sum: f32,
    since_refresh: usize,
}

impl RunningEnergy {
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "energy window length must be non-zero");
        Self {
            history: HeapRb::new(len),
            sum: 0.0,
            since_refresh: 0,
        }
    }

    pub fn push<T: Sample>(&mut self, x: T) {
        let e = x.energy();
        let evicted = self.history.push_overwrite(e).unwrap_or(0.0);
        self.sum += e - evicted;

        self.since_refresh += 1;
        if self.since_refresh >= self.history.capacity().get() {
            self.sum = self.history.iter().sum();
            self.since_refresh = 0;
        }
    }

    /// Current energy sum, never negative
    pub fn sum(&self) -> f32 {
        self.sum.max(0.0)
    }

    /// Number of samples seen, saturating at the window length
    pub fn filled(&self) -> usize {
        self.history.occupied_len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.sum = 0.0;
        self.since_refresh = 0;
    }
}
