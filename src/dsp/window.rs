//! Fixed-length sample history
//!
//! Every sample is written twice, `len` slots apart, so the most recent `len`
//! samples are always available as one contiguous slice (oldest first)
//! without copying.

use super::sample::Sample;

/// Sliding window over the most recent `len` samples
#[derive(Clone)]
pub struct Window<T: Sample> {
    buffer: Vec<T>,
    len: usize,
    /// Index of the newest sample in the lower half
    position: usize,
}

impl<T: Sample> Window<T> {
    /// Create a zero-filled window. `len` must be non-zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "window length must be non-zero");
        Self {
            buffer: vec![T::zero(); 2 * len],
            len,
            position: len - 1,
        }
    }

    pub fn push(&mut self, x: T) {
        self.position = (self.position + 1) % self.len;
        self.buffer[self.position] = x;
        self.buffer[self.position + self.len] = x;
    }

    /// Window contents, oldest sample first
    pub fn as_slice(&self) -> &[T] {
        let start = self.position + 1;
        &self.buffer[start..start + self.len]
    }

    /// Most recently pushed sample
    pub fn newest(&self) -> T {
        self.buffer[self.position]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Refill with zeros
    pub fn reset(&mut self) {
        self.buffer.fill(T::zero());
        self.position = self.len - 1;
    }
}
