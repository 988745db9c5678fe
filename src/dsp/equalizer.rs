//! Adaptive equalizers
//!
//! Both equalizers run one complex tap per symbol. Tap `i` multiplies the
//! input `i` symbols back, so the default (a unit first tap) passes symbols
//! through with no added delay.
//!
//! Internally the filter keeps `w` with output `y = Σ conj(w[i]) x[n-i]`;
//! [`Equalizer::weights`] reports the plain taps `conj(w)`.

use num_complex::Complex32;

use super::energy::RunningEnergy;
use super::window::Window;

/// Symbol-rate adaptive filter
pub trait Equalizer: Send {
    /// Number of taps, fixed at construction
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push one input symbol into the history
    fn push(&mut self, x: Complex32);

    /// Filter output for the current history
    fn execute(&self) -> Complex32;

    /// Adapt towards `desired` given the output `actual` for the current
    /// history. No-op until the history has filled once.
    fn step(&mut self, desired: Complex32, actual: Complex32);

    /// Current taps, first tap applies to the newest input
    fn weights(&self) -> Vec<Complex32>;

    fn set_weights(&mut self, taps: &[Complex32]);

    /// Adaptation rate (LMS step size, RLS forgetting complement)
    fn set_bw(&mut self, mu: f32);

    /// Clear history and restore the initial taps
    fn reset(&mut self);

    /// Push `x`, filter, and return the output
    fn push_execute(&mut self, x: Complex32) -> Complex32 {
        self.push(x);
        self.execute()
    }
}

/// Unit first tap, zeros elsewhere
pub fn identity_taps(len: usize) -> Vec<Complex32> {
    let mut taps = vec![Complex32::new(0.0, 0.0); len];
    if let Some(first) = taps.first_mut() {
        *first = Complex32::new(1.0, 0.0);
    }
    taps
}

fn dot(w: &[Complex32], history: &Window<Complex32>) -> Complex32 {
    w.iter()
        .zip(history.as_slice().iter().rev())
        .map(|(w, x)| w.conj() * x)
        .sum()
}

/// Normalized least-mean-squares equalizer
pub struct LmsEqualizer {
    initial: Vec<Complex32>,
    w: Vec<Complex32>,
    history: Window<Complex32>,
    energy: RunningEnergy,
    /// Inputs seen since reset, saturating at the length
    count: usize,
    mu: f32,
}

impl LmsEqualizer {
    pub fn new(len: usize, mu: f32) -> Self {
        Self::with_taps(&identity_taps(len), mu)
    }

    /// Start from `taps` (restored again by `reset`)
    pub fn with_taps(taps: &[Complex32], mu: f32) -> Self {
        assert!(!taps.is_empty(), "equalizer needs at least one tap");
        let len = taps.len();
        Self {
            initial: taps.to_vec(),
            w: taps.iter().map(|h| h.conj()).collect(),
            history: Window::new(len),
            energy: RunningEnergy::new(len),
            count: 0,
            mu,
        }
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }
}

impl Equalizer for LmsEqualizer {
    fn len(&self) -> usize {
        self.w.len()
    }

    fn push(&mut self, x: Complex32) {
        self.history.push(x);
        self.energy.push(x);
        self.count = (self.count + 1).min(self.w.len());
    }

    fn execute(&self) -> Complex32 {
        dot(&self.w, &self.history)
    }

    fn step(&mut self, desired: Complex32, actual: Complex32) {
        if self.count < self.w.len() {
            return;
        }
        let norm = self.energy.sum();
        if norm <= f32::EPSILON {
            return;
        }

        let gain = (desired - actual).conj() * (self.mu / norm);
        for (w, x) in self.w.iter_mut().zip(self.history.as_slice().iter().rev()) {
            *w += gain * x;
        }
    }

    fn weights(&self) -> Vec<Complex32> {
        self.w.iter().map(|w| w.conj()).collect()
    }

    fn set_weights(&mut self, taps: &[Complex32]) {
        assert_eq!(taps.len(), self.w.len(), "equalizer length is fixed");
        for (w, h) in self.w.iter_mut().zip(taps) {
            *w = h.conj();
        }
    }

    fn set_bw(&mut self, mu: f32) {
        self.mu = mu;
    }

    fn reset(&mut self) {
        for (w, h) in self.w.iter_mut().zip(&self.initial) {
            *w = h.conj();
        }
        self.history.reset();
        self.energy.reset();
        self.count = 0;
    }
}

/// Recursive-least-squares equalizer
pub struct RlsEqualizer {
    initial: Vec<Complex32>,
    w: Vec<Complex32>,
    history: Window<Complex32>,
    count: usize,
    /// Forgetting factor
    lambda: f32,
    /// Inverse correlation estimate, row-major `len x len`
    p: Vec<Complex32>,
    /// Scratch for `P x`
    px: Vec<Complex32>,
}

/// Initial inverse-correlation diagonal is `1 / RLS_DELTA`
const RLS_DELTA: f32 = 0.1;

impl RlsEqualizer {
    /// `mu` sets the forgetting factor `lambda = 1 - mu`
    pub fn new(len: usize, mu: f32) -> Self {
        Self::with_taps(&identity_taps(len), mu)
    }

    pub fn with_taps(taps: &[Complex32], mu: f32) -> Self {
        assert!(!taps.is_empty(), "equalizer needs at least one tap");
        let len = taps.len();
        let mut eq = Self {
            initial: taps.to_vec(),
            w: taps.iter().map(|h| h.conj()).collect(),
            history: Window::new(len),
            count: 0,
            lambda: 1.0 - mu,
            p: vec![Complex32::new(0.0, 0.0); len * len],
            px: vec![Complex32::new(0.0, 0.0); len],
        };
        eq.reset_correlation();
        eq
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    fn reset_correlation(&mut self) {
        let n = self.w.len();
        self.p.fill(Complex32::new(0.0, 0.0));
        for i in 0..n {
            self.p[i * n + i] = Complex32::new(RLS_DELTA.recip(), 0.0);
        }
    }
}

impl Equalizer for RlsEqualizer {
    fn len(&self) -> usize {
        self.w.len()
    }

    fn push(&mut self, x: Complex32) {
        self.history.push(x);
        self.count = (self.count + 1).min(self.w.len());
    }

    fn execute(&self) -> Complex32 {
        dot(&self.w, &self.history)
    }

    fn step(&mut self, desired: Complex32, actual: Complex32) {
        if self.count < self.w.len() {
            return;
        }
        let n = self.w.len();
        let x: Vec<Complex32> = self.history.as_slice().iter().rev().copied().collect();

        for r in 0..n {
            self.px[r] = (0..n).map(|c| self.p[r * n + c] * x[c]).sum();
        }
        let xpx: Complex32 = x.iter().zip(&self.px).map(|(x, px)| x.conj() * px).sum();
        let denom = self.lambda + xpx.re.max(0.0);

        let error = (desired - actual).conj();
        let inv_lambda = self.lambda.recip();
        for r in 0..n {
            let g = self.px[r] / denom;
            self.w[r] += g * error;
            for c in 0..n {
                let idx = r * n + c;
                self.p[idx] = (self.p[idx] - g * self.px[c].conj()) * inv_lambda;
            }
        }
    }

    fn weights(&self) -> Vec<Complex32> {
        self.w.iter().map(|w| w.conj()).collect()
    }

    fn set_weights(&mut self, taps: &[Complex32]) {
        assert_eq!(taps.len(), self.w.len(), "equalizer length is fixed");
        for (w, h) in self.w.iter_mut().zip(taps) {
            *w = h.conj();
        }
    }

    fn set_bw(&mut self, mu: f32) {
        self.lambda = 1.0 - mu;
    }

    fn reset(&mut self) {
        for (w, h) in self.w.iter_mut().zip(&self.initial) {
            *w = h.conj();
        }
        self.history.reset();
        self.count = 0;
        self.reset_correlation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qpsk(n: usize, seed: u32) -> Vec<Complex32> {
        let mut state = seed;
        let a = std::f32::consts::FRAC_1_SQRT_2;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let i = if state & 1 == 1 { a } else { -a };
                let q = if state & 2 == 2 { a } else { -a };
                Complex32::new(i, q)
            })
            .collect()
    }

    /// Two-tap channel with a rotated post-cursor echo
    fn channel(d: &[Complex32]) -> Vec<Complex32> {
        let echo = Complex32::new(0.25, 0.1);
        let mut prev = Complex32::new(0.0, 0.0);
        d.iter()
            .map(|&s| {
                let y = s + echo * prev;
                prev = s;
                y
            })
            .collect()
    }

    fn train(eq: &mut dyn Equalizer, d: &[Complex32]) -> f32 {
        let x = channel(d);
        let mut tail_mse = 0.0;
        for (n, (&xn, &dn)) in x.iter().zip(d).enumerate() {
            let y = eq.push_execute(xn);
            eq.step(dn, y);
            if n >= d.len() - 100 {
                tail_mse += (dn - y).norm_sqr() / 100.0;
            }
        }
        tail_mse
    }

    #[test]
    fn test_default_taps_pass_through() {
        let mut eq = LmsEqualizer::new(4, 0.1);
        let x = Complex32::new(0.3, -0.2);
        assert_eq!(eq.push_execute(x), x);
        assert_eq!(eq.weights(), identity_taps(4));
    }

    #[test]
    fn test_lms_removes_echo() {
        let d = qpsk(4000, 17);
        let mut eq = LmsEqualizer::new(5, 0.3);
        let mse = train(&mut eq, &d);
        assert!(mse < 0.01, "LMS residual MSE {mse}");
    }

    #[test]
    fn test_rls_removes_echo_quickly() {
        let d = qpsk(400, 23);
        let mut eq = RlsEqualizer::new(5, 0.01);
        let mse = train(&mut eq, &d);
        assert!(mse < 0.01, "RLS residual MSE {mse}");
    }

    #[test]
    fn test_correct_output_leaves_weights_alone() {
        let mut eq = LmsEqualizer::new(3, 0.5);
        for s in qpsk(50, 3) {
            let y = eq.push_execute(s);
            eq.step(y, y);
        }
        assert_eq!(eq.weights(), identity_taps(3));
    }

    #[test]
    fn test_no_adaptation_before_history_fills() {
        let mut eq = LmsEqualizer::new(4, 0.5);
        let y = eq.push_execute(Complex32::new(1.0, 0.0));
        eq.step(Complex32::new(0.0, 1.0), y);
        assert_eq!(eq.weights(), identity_taps(4));
    }

    #[test]
    fn test_set_weights_then_reset_restores_initial() {
        let taps = vec![Complex32::new(0.5, 0.5), Complex32::new(0.1, 0.0)];
        let mut eq = RlsEqualizer::with_taps(&taps, 0.02);
        let custom = vec![Complex32::new(0.0, 1.0), Complex32::new(0.0, 0.0)];
        eq.set_weights(&custom);
        assert_eq!(eq.weights(), custom);

        // Output uses the plain taps
        let y = eq.push_execute(Complex32::new(1.0, 0.0));
        assert!((y - Complex32::new(0.0, 1.0)).norm() < 1e-6);

        eq.reset();
        assert_eq!(eq.weights(), taps);
    }

    #[test]
    #[should_panic(expected = "length is fixed")]
    fn test_set_weights_rejects_wrong_length() {
        let mut eq = LmsEqualizer::new(3, 0.1);
        eq.set_weights(&identity_taps(4));
    }

    #[test]
    fn test_set_bw_changes_rate() {
        let mut lms = LmsEqualizer::new(2, 0.1);
        lms.set_bw(0.2);
        assert_eq!(lms.mu(), 0.2);
        let mut rls = RlsEqualizer::new(2, 0.1);
        rls.set_bw(0.01);
        assert!((rls.lambda() - 0.99).abs() < 1e-6);
    }
}
