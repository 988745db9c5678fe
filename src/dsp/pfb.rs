//! Polyphase filterbank
//!
//! One prototype filter split into `P` sub-filters. Sub-filter `p` takes taps
//! `h[p], h[p + P], h[p + 2P], ...` and produces the filtered signal `p/P`
//! of an input sample later than sub-filter 0. All branches share one input
//! history, so selecting a branch per output costs a single dot product.
//!
//! The same structure serves as a fractional-delay interpolator for timing
//! recovery and, with `P = k`, as a k-times interpolating pulse shaper.

use std::sync::Arc;

use super::sample::Sample;
use super::window::Window;

pub struct Pfb<T: Sample> {
    /// Sub-filter taps, `sub_len` consecutive values per branch
    taps: Arc<[f32]>,
    num_filters: usize,
    sub_len: usize,
    history: Window<T>,
}

impl<T: Sample> Pfb<T> {
    /// Split `prototype` into `num_filters` branches. The prototype is
    /// zero-padded to a multiple of `num_filters`.
    pub fn new(num_filters: usize, prototype: &[f32]) -> Self {
        assert!(num_filters > 0, "filterbank needs at least one branch");
        assert!(!prototype.is_empty(), "prototype filter is empty");

        let sub_len = prototype.len().div_ceil(num_filters);
        let mut taps = Vec::with_capacity(num_filters * sub_len);
        for p in 0..num_filters {
            for n in 0..sub_len {
                taps.push(prototype.get(p + n * num_filters).copied().unwrap_or(0.0));
            }
        }

        Self {
            taps: taps.into(),
            num_filters,
            sub_len,
            history: Window::new(sub_len),
        }
    }

    /// Push one input sample into the shared history
    pub fn push(&mut self, x: T) {
        self.history.push(x);
    }

    /// Output of branch `index` for the current history
    pub fn execute(&self, index: usize) -> T {
        assert!(
            index < self.num_filters,
            "branch {index} out of range for {} filters",
            self.num_filters
        );
        let h = &self.taps[index * self.sub_len..(index + 1) * self.sub_len];
        h.iter()
            .zip(self.history.as_slice().iter().rev())
            .fold(T::zero(), |acc, (&tap, &x)| acc + x * tap)
    }

    pub fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// Taps per branch
    pub fn sub_len(&self) -> usize {
        self.sub_len
    }

    /// Clear the input history, keeping the coefficients
    pub fn reset(&mut self) {
        self.history.reset();
    }
}

impl<T: Sample> Clone for Pfb<T> {
    /// Clones share the coefficient table and get their own history
    fn clone(&self) -> Self {
        Self {
            taps: Arc::clone(&self.taps),
            num_filters: self.num_filters,
            sub_len: self.sub_len,
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn test_single_branch_is_plain_fir() {
        let mut pfb: Pfb<f32> = Pfb::new(1, &[1.0, 0.5, 0.25]);
        let mut out = Vec::new();
        for x in [1.0, 0.0, 0.0, 0.0] {
            pfb.push(x);
            out.push(pfb.execute(0));
        }
        assert_eq!(out, vec![1.0, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_branches_interleave_prototype() {
        let proto: Vec<f32> = (1..=6).map(|x| x as f32).collect();
        let mut pfb: Pfb<f32> = Pfb::new(3, &proto);
        assert_eq!(pfb.sub_len(), 2);

        // Impulse response of branch p is h[p], h[p+3]
        pfb.push(1.0);
        assert_eq!(pfb.execute(0), 1.0);
        assert_eq!(pfb.execute(1), 2.0);
        assert_eq!(pfb.execute(2), 3.0);
        pfb.push(0.0);
        assert_eq!(pfb.execute(0), 4.0);
        assert_eq!(pfb.execute(2), 6.0);
    }

    #[test]
    fn test_pads_prototype_to_branch_multiple() {
        let pfb: Pfb<f32> = Pfb::new(4, &[1.0; 9]);
        assert_eq!(pfb.sub_len(), 3);
    }

    #[test]
    fn test_interpolates_ramp_at_fractional_delays() {
        // Linear-interpolation prototype: a triangle spanning two samples
        let p = 4;
        let proto: Vec<f32> = (0..2 * p + 1)
            .map(|i| 1.0 - (i as f32 - p as f32).abs() / p as f32)
            .collect();
        let mut pfb: Pfb<f32> = Pfb::new(p, &proto);
        for x in 0..10 {
            pfb.push(x as f32);
        }
        // Branch 0 lags the input by one sample; each branch adds 1/P
        for b in 0..p {
            let expected = 8.0 + b as f32 / p as f32;
            let got = pfb.execute(b);
            assert!((got - expected).abs() < 1e-5, "branch {b}: {got} vs {expected}");
        }
    }

    #[test]
    fn test_works_on_complex_samples() {
        let mut pfb: Pfb<Complex32> = Pfb::new(2, &[1.0, 2.0, 3.0]);
        pfb.push(Complex32::new(0.0, 1.0));
        assert_eq!(pfb.execute(1), Complex32::new(0.0, 2.0));
    }

    #[test]
    fn test_clones_share_taps_but_not_history() {
        let mut a: Pfb<f32> = Pfb::new(1, &[1.0]);
        let b = a.clone();
        a.push(5.0);
        assert_eq!(a.execute(0), 5.0);
        assert_eq!(b.execute(0), 0.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_rejects_out_of_range_branch() {
        let pfb: Pfb<f32> = Pfb::new(2, &[1.0, 1.0]);
        pfb.execute(2);
    }
}
