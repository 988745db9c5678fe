//! Polyphase symbol-timing recovery
//!
//! Matched filtering and fractional interpolation happen in one step: a
//! filterbank of `P` root raised-cosine branches, each a different fraction
//! of a sample late, plus a second bank holding the derivative of the same
//! prototype.
//!
//! `tau` counts samples until the next symbol. Each input sample the loop
//! checks whether the next symbol falls before the following sample; if so
//! it emits the matched-filter output from branch `round(tau * P)` and adds
//! `del = k + q_hat` to `tau`. After every sample `tau` drops by one.
//!
//! Timing error is `Re(conj(mf) * dmf)`, clipped to [-1, 1] and smoothed by a
//! one-pole filter. The derivative bank is the per-sample slope of the
//! prototype; its expected detector slope is computed from the pulse shape so
//! one bandwidth setting behaves the same for any `k` and `beta`. `q_hat` is
//! limited to one branch per symbol, so the filterbank index moves by at most
//! one branch between consecutive symbols.

use std::f32::consts::PI;

use num_complex::Complex32;

use super::pfb::Pfb;
use super::raised_cosine::root_raised_cosine;
use crate::domain::{FrameSyncError, SyncResult};

pub struct SymbolSync {
    k: usize,
    num_filters: usize,
    mf: Pfb<Complex32>,
    dmf: Pfb<Complex32>,

    /// Samples until the next output, fractional
    tau: f32,
    /// `tau` at the most recent output, in [0, 1)
    tau_decim: f32,
    /// Filterbank branch used for the most recent output
    index: usize,
    /// Sample advance between outputs
    del: f32,

    /// Smoothed timing error
    q_hat: f32,
    /// Expected d(q)/d(tau) near lock, per sample
    ted_gain: f32,
    alpha: f32,
    beta: f32,
    bandwidth: f32,
    locked: bool,
}

impl SymbolSync {
    /// Timing recovery for a root raised-cosine link
    ///
    /// - `k`: samples per symbol (at least 2)
    /// - `m`: filter semi-length in symbols
    /// - `beta`: excess bandwidth
    /// - `num_filters`: filterbank branches (timing resolution 1/P sample)
    pub fn new(k: usize, m: usize, beta: f32, num_filters: usize) -> SyncResult<Self> {
        if k < 2 {
            return Err(FrameSyncError::Config(format!(
                "timing recovery needs at least 2 samples/symbol (got {k})"
            )));
        }
        if m < 1 {
            return Err(FrameSyncError::Config(
                "timing recovery filter semi-length must be at least 1".into(),
            ));
        }
        if !(beta > 0.0 && beta <= 1.0) {
            return Err(FrameSyncError::Config(format!(
                "excess bandwidth must be in (0, 1] (got {beta})"
            )));
        }
        if num_filters < 1 {
            return Err(FrameSyncError::Config(
                "timing recovery needs at least one filter".into(),
            ));
        }

        let prototype = matched_prototype(k, m, beta, num_filters);
        let derivative = derivative_prototype(&prototype, num_filters);

        let mut sync = Self {
            k,
            num_filters,
            mf: Pfb::new(num_filters, &prototype),
            dmf: Pfb::new(num_filters, &derivative),
            tau: 0.0,
            tau_decim: 0.0,
            index: 0,
            del: k as f32,
            q_hat: 0.0,
            ted_gain: detector_slope(k, beta),
            alpha: 0.0,
            beta: 0.0,
            bandwidth: 0.0,
            locked: false,
        };
        sync.set_bandwidth(0.1);
        Ok(sync)
    }

    /// Set loop bandwidth `bt` in (0, 1). The loop is critically damped with
    /// both poles at sqrt(1 - bt).
    pub fn set_bandwidth(&mut self, bt: f32) {
        assert!(bt > 0.0 && bt < 1.0, "timing bandwidth must be in (0, 1) (got {bt})");
        self.bandwidth = bt;
        self.alpha = 1.0 - bt;
        self.beta = bt * bt / (4.0 * self.ted_gain);
    }

    pub fn bandwidth(&self) -> f32 {
        self.bandwidth
    }

    /// Fractional timing estimate at the last output, in [0, 1) samples
    pub fn get_tau(&self) -> f32 {
        self.tau_decim
    }

    /// Filterbank branch used for the last output
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// Current sample advance between outputs
    pub fn rate(&self) -> f32 {
        if self.locked {
            self.k as f32
        } else {
            self.del
        }
    }

    /// Freeze the loop; outputs then advance by exactly `k` samples
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Schedule the next output `delay` samples after the next input,
    /// `delay` may be fractional. Used to seed the loop from an external
    /// timing estimate.
    pub fn set_timing(&mut self, delay: f32) {
        assert!(delay >= 0.0, "timing delay must be non-negative (got {delay})");
        self.tau = delay;
    }

    /// Clear filter history and loop state. The lock flag is released.
    pub fn reset(&mut self) {
        self.mf.reset();
        self.dmf.reset();
        self.tau = 0.0;
        self.tau_decim = 0.0;
        self.index = 0;
        self.del = self.k as f32;
        self.q_hat = 0.0;
        self.locked = false;
    }

    /// Push one input sample; returns a symbol when one is due
    pub fn step(&mut self, x: Complex32) -> Option<Complex32> {
        self.mf.push(x);
        self.dmf.push(x);

        let branch = (self.tau * self.num_filters as f32).round().max(0.0) as usize;
        let output = if branch < self.num_filters {
            let mf = self.mf.execute(branch);
            self.index = branch;
            self.tau_decim = (branch as f32 / self.num_filters as f32).clamp(0.0, 1.0);
            if !self.locked {
                let dmf = self.dmf.execute(branch);
                self.update_loop(mf, dmf);
            }
            self.tau += self.rate();
            Some(mf)
        } else {
            None
        };

        self.tau -= 1.0;
        output
    }

    /// Run a block of samples, returning the recovered symbols
    pub fn execute(&mut self, input: &[Complex32]) -> Vec<Complex32> {
        input.iter().filter_map(|&x| self.step(x)).collect()
    }

    fn update_loop(&mut self, mf: Complex32, dmf: Complex32) {
        let q = (mf.conj() * dmf).re.clamp(-1.0, 1.0);
        let max_step = 1.0 / self.num_filters as f32;
        self.q_hat = (self.beta * q + self.alpha * self.q_hat).clamp(-max_step, max_step);
        self.del = self.k as f32 + self.q_hat;
    }
}

/// Matched-filter prototype at `k * num_filters` samples/symbol, scaled so
/// each branch has unit gain at the symbol peak for a unit-power transmitter.
fn matched_prototype(k: usize, m: usize, beta: f32, num_filters: usize) -> Vec<f32> {
    let gain = (num_filters as f32 / k as f32).sqrt();
    root_raised_cosine(k * num_filters, m, beta, 0.0)
        .into_iter()
        .map(|h| h * gain)
        .collect()
}

/// Curvature of a raised-cosine pulse at its peak, -p''(0), with time
/// measured in samples. Near lock `q ≈ -slope * timing_error`.
fn detector_slope(k: usize, beta: f32) -> f32 {
    let per_symbol = PI * PI / 3.0 + (PI * PI - 8.0) * beta * beta;
    per_symbol / (k * k) as f32
}

/// Central difference of the prototype, per input sample
fn derivative_prototype(h: &[f32], num_filters: usize) -> Vec<f32> {
    let scale = 0.5 * num_filters as f32;
    (0..h.len())
        .map(|i| {
            let next = h.get(i + 1).copied().unwrap_or(0.0);
            let prev = if i > 0 { h[i - 1] } else { 0.0 };
            (next - prev) * scale
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::raised_cosine::transmit_taps;

    /// Deterministic BPSK symbols
    fn symbols(n: usize, seed: u32) -> Vec<Complex32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                Complex32::new(if state & 1 == 1 { 1.0 } else { -1.0 }, 0.0)
            })
            .collect()
    }

    /// Pulse-shape `syms` at k samples/symbol with a fractional delay
    fn shape(syms: &[Complex32], k: usize, m: usize, beta: f32, delay: f32) -> Vec<Complex32> {
        let gain = (k as f32).sqrt();
        let taps: Vec<f32> = root_raised_cosine(k, m, beta, delay)
            .into_iter()
            .map(|h| h * gain)
            .collect();
        let mut interp: Pfb<Complex32> = Pfb::new(k, &taps);
        let mut out = Vec::with_capacity(syms.len() * k);
        for &s in syms {
            interp.push(s);
            for p in 0..k {
                out.push(interp.execute(p));
            }
        }
        out
    }

    fn circular_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(1.0);
        d.min(1.0 - d)
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(SymbolSync::new(1, 3, 0.3, 32).is_err());
        assert!(SymbolSync::new(2, 0, 0.3, 32).is_err());
        assert!(SymbolSync::new(2, 3, 0.0, 32).is_err());
        assert!(SymbolSync::new(2, 3, 0.3, 0).is_err());
    }

    #[test]
    fn test_emits_one_symbol_per_k_samples() {
        let k = 4;
        let mut sync = SymbolSync::new(k, 3, 0.5, 16).unwrap();
        let syms = symbols(500, 7);
        let x = shape(&syms, k, 3, 0.5, 0.0);
        let y = sync.execute(&x);
        let expected = syms.len() as i64;
        assert!(
            (y.len() as i64 - expected).abs() <= 1,
            "{} outputs for {expected} symbols",
            y.len()
        );
    }

    #[test]
    fn test_never_emits_two_symbols_for_one_sample() {
        let mut sync = SymbolSync::new(2, 4, 0.3, 32).unwrap();
        let syms = symbols(400, 3);
        let x = shape(&syms, 2, 4, 0.3, 0.3);
        let mut last_emit: Option<usize> = None;
        for (i, &s) in x.iter().enumerate() {
            if sync.step(s).is_some() {
                if let Some(prev) = last_emit {
                    assert!(i > prev, "two symbols at sample {i}");
                }
                last_emit = Some(i);
            }
            assert!(sync.index() < sync.num_filters());
        }
    }

    #[test]
    fn test_index_moves_at_most_one_branch() {
        let (k, m, beta, p) = (2, 7, 0.5, 32);
        let mut sync = SymbolSync::new(k, m, beta, p).unwrap();
        sync.set_bandwidth(0.5);
        let x = shape(&symbols(5000, 0xdead_beef), k, m, beta, 0.37);
        assert!(x.len() >= 10_000);

        let mut last: Option<usize> = None;
        let mut outputs = 0;
        for &s in &x {
            if sync.step(s).is_none() {
                continue;
            }
            outputs += 1;
            let index = sync.index();
            if let Some(prev) = last {
                let d = index.abs_diff(prev);
                let d = d.min(p - d);
                assert!(d <= 1, "index jumped {prev} -> {index} at output {outputs}");
            }
            last = Some(index);
        }
        assert!(outputs > 4900, "only {outputs} outputs");
    }

    #[test]
    fn test_converges_on_fractional_offsets() {
        let (k, m, beta) = (2, 7, 0.3);
        for &delay in &[-0.45f32, -0.2, 0.0, 0.25, 0.4] {
            let mut sync = SymbolSync::new(k, m, beta, 32).unwrap();
            sync.set_bandwidth(0.1);
            let syms = symbols(2000, 0x1234_5678);
            let x = shape(&syms, k, m, beta, delay);

            let mut taus = Vec::new();
            for &s in &x {
                if sync.step(s).is_some() {
                    taus.push(sync.get_tau());
                }
            }

            let expected = delay.rem_euclid(1.0);
            for (n, &tau) in taus.iter().enumerate().skip(400) {
                let err = circular_distance(tau, expected);
                assert!(
                    err < 0.05,
                    "delay {delay}: symbol {n} tau {tau}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_recovers_symbols_after_convergence() {
        let (k, m, beta) = (2, 7, 0.3);
        let mut sync = SymbolSync::new(k, m, beta, 32).unwrap();
        let syms = symbols(1000, 99);
        let x = shape(&syms, k, m, beta, 0.35);
        let y = sync.execute(&x);

        // Symbol-level output lags by the combined filter delay
        let tail = &y[y.len() - 200..];
        let errors = tail.iter().filter(|s| s.re.abs() < 0.7 || s.im.abs() > 0.2).count();
        assert_eq!(errors, 0, "eye not open after convergence");
    }

    #[test]
    fn test_matches_transmit_gain() {
        // Matched pair has unit gain at the symbol peak
        let k = 2;
        let tx = transmit_taps(k, 5, 0.4);
        let proto = matched_prototype(k, 5, 0.4, 1);
        let peak: f32 = tx.iter().zip(&proto).map(|(a, b)| a * b).sum();
        assert!((peak - 1.0).abs() < 1e-3, "cascade gain {peak}");
    }

    #[test]
    fn test_lock_freezes_rate() {
        let mut sync = SymbolSync::new(2, 4, 0.3, 32).unwrap();
        let x = shape(&symbols(200, 5), 2, 4, 0.3, 0.2);
        sync.execute(&x);
        sync.lock();
        assert!(sync.is_locked());
        assert_eq!(sync.rate(), 2.0);
        let before = sync.get_tau();
        sync.execute(&x[..100]);
        assert!(circular_distance(sync.get_tau(), before) < 1e-3);
        sync.unlock();
        assert!(!sync.is_locked());
    }

    #[test]
    fn test_set_timing_delays_first_output() {
        let mut sync = SymbolSync::new(2, 2, 0.5, 8).unwrap();
        sync.set_timing(5.25);
        let zero = Complex32::new(0.0, 0.0);
        let emitted: Vec<usize> = (0..8).filter(|_| sync.step(zero).is_some()).collect();
        assert_eq!(emitted.first(), Some(&5));
        assert!((sync.get_tau() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_reset_rearms() {
        let mut sync = SymbolSync::new(2, 3, 0.3, 16).unwrap();
        let x = shape(&symbols(100, 11), 2, 3, 0.3, 0.1);
        let first = sync.execute(&x);
        sync.lock();
        sync.reset();
        assert!(!sync.is_locked());
        let second = sync.execute(&x);
        assert_eq!(first, second);
    }
}
