//! Preamble detector
//!
//! Cross-correlates the incoming stream against a known, pulse-shaped
//! preamble template. The correlation is normalized by template and window
//! energy, so the metric lies in [0, 1] regardless of channel gain.
//!
//! A single coherent correlation over a long template loses most of its gain
//! once the carrier rotates by a significant fraction of a turn across the
//! window. The detector therefore runs a small bank of correlators, each
//! de-rotating the template by one carrier offset hypothesis spaced `pi / n`
//! apart across `±dphi_max`, and takes the strongest.
//!
//! Once the metric crosses the threshold the detector keeps going until the
//! metric stops rising, then reports the peak one sample late. Estimates at
//! the peak:
//!
//! - `tau_hat`: parabolic fit over the three metric values around the peak
//! - `dphi_hat`: winning hypothesis plus the residual phase slope of its
//!   de-modulated correlation terms
//! - `phi_hat`: correlation phase, referred back to the first replay sample
//! - `gamma_hat`: sqrt(window energy / template energy)
//!
//! The detector keeps enough history that the synchronizer can replay the
//! whole preamble, plus the matched-filter warm-up, into its receive chain.

use num_complex::Complex32;

use super::energy::RunningEnergy;
use super::window::Window;
use crate::domain::DetectionStats;

/// Window energy below which the metric is forced to zero
const ENERGY_FLOOR: f32 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Seek,
    FindMax,
}

/// Correlation values captured at the current best peak
#[derive(Debug, Clone, Copy)]
struct Peak {
    rxy: Complex32,
    energy: f32,
    /// Offset of the winning hypothesis
    offset: f32,
    dphi: f32,
}

/// Template de-rotated by one carrier offset hypothesis
struct Hypothesis {
    offset: f32,
    /// `conj(s[i]) * exp(-j * offset * i)`, oldest sample first
    taps: Vec<Complex32>,
}

impl Hypothesis {
    fn new(template: &[Complex32], offset: f32) -> Self {
        let taps = template
            .iter()
            .enumerate()
            .map(|(i, s)| s.conj() * Complex32::from_polar(1.0, -offset * i as f32))
            .collect();
        Self { offset, taps }
    }
}

/// Offsets `j * pi / n` for `|j| <= ceil(dphi_max * n / pi)`
fn hypothesis_offsets(n: usize, dphi_max: f32) -> Vec<f32> {
    let step = std::f32::consts::PI / n as f32;
    let reach = (dphi_max / step - 1e-4).ceil().max(0.0) as i32;
    (-reach..=reach).map(|j| j as f32 * step).collect()
}

pub struct PreambleDetector {
    /// Correlator bank, one per carrier offset hypothesis
    bank: Vec<Hypothesis>,
    template_energy: f32,
    threshold: f32,
    /// Samples between the first replay sample and the first template sample
    lead: usize,
    history: Window<Complex32>,
    energy: RunningEnergy,
    state: DetectorState,

    /// Metric one sample before, at, and after the peak
    rxy0: f32,
    rxy1: f32,
    peak: Option<Peak>,
}

impl PreambleDetector {
    /// Build a detector for `template`, keeping `lead` extra samples of
    /// history ahead of it for replay. Carrier offsets up to `dphi_max`
    /// radians/sample are searched; zero runs a single plain correlator.
    pub fn new(template: &[Complex32], lead: usize, threshold: f32, dphi_max: f32) -> Self {
        assert!(!template.is_empty(), "preamble template is empty");
        assert!(
            threshold > 0.0 && threshold <= 1.0,
            "threshold must be in (0, 1] (got {threshold})"
        );
        assert!(
            (0.0..std::f32::consts::PI).contains(&dphi_max),
            "dphi_max must be in [0, pi) (got {dphi_max})"
        );

        let n = template.len();
        Self {
            bank: hypothesis_offsets(n, dphi_max)
                .into_iter()
                .map(|offset| Hypothesis::new(template, offset))
                .collect(),
            template_energy: template.iter().map(|s| s.norm_sqr()).sum(),
            threshold,
            lead,
            // +1: the peak is only recognised one sample after it occurs
            history: Window::new(lead + n + 1),
            energy: RunningEnergy::new(n),
            state: DetectorState::Seek,
            rxy0: 0.0,
            rxy1: 0.0,
            peak: None,
        }
    }

    /// Template length in samples
    pub fn template_len(&self) -> usize {
        self.bank[0].taps.len()
    }

    /// Number of carrier offset hypotheses searched per sample
    pub fn num_hypotheses(&self) -> usize {
        self.bank.len()
    }

    /// Length of the replay window returned by [`Self::buffer`]
    pub fn buffer_len(&self) -> usize {
        self.history.len()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        assert!(threshold > 0.0 && threshold <= 1.0);
        self.threshold = threshold;
    }

    /// Replay window, oldest sample first. The first template sample sits at
    /// index `lead` (plus `tau_hat`) and the newest sample is last.
    pub fn buffer(&self) -> &[Complex32] {
        self.history.as_slice()
    }

    /// Push one sample; returns estimates when a preamble peak is confirmed
    pub fn push(&mut self, x: Complex32) -> Option<DetectionStats> {
        self.history.push(x);
        self.energy.push(x);

        let (metric, best, rxy) = self.correlate();

        match self.state {
            DetectorState::Seek => {
                if metric > self.threshold {
                    self.state = DetectorState::FindMax;
                    self.rxy1 = metric;
                    self.peak = Some(self.capture_peak(best, rxy));
                } else {
                    self.rxy0 = metric;
                }
                None
            }
            DetectorState::FindMax => {
                if metric > self.rxy1 {
                    self.rxy0 = self.rxy1;
                    self.rxy1 = metric;
                    self.peak = Some(self.capture_peak(best, rxy));
                    None
                } else {
                    let stats = self.finish(metric);
                    self.state = DetectorState::Seek;
                    self.rxy0 = metric;
                    self.peak = None;
                    stats
                }
            }
        }
    }

    /// Clear history and return to seeking
    pub fn reset(&mut self) {
        self.history.reset();
        self.energy.reset();
        self.state = DetectorState::Seek;
        self.rxy0 = 0.0;
        self.rxy1 = 0.0;
        self.peak = None;
    }

    /// Correlation window: the newest `n` samples
    fn window(&self) -> &[Complex32] {
        let buf = self.history.as_slice();
        &buf[buf.len() - self.template_len()..]
    }

    /// Strongest correlator: (metric, bank index, correlation)
    fn correlate(&self) -> (f32, usize, Complex32) {
        let window = self.window();
        let (best, rxy) = self
            .bank
            .iter()
            .map(|h| -> Complex32 { window.iter().zip(&h.taps).map(|(r, s)| r * s).sum() })
            .enumerate()
            .fold((0, Complex32::new(0.0, 0.0)), |acc, (i, rxy)| {
                if rxy.norm_sqr() > acc.1.norm_sqr() {
                    (i, rxy)
                } else {
                    acc
                }
            });

        let ex = self.energy.sum();
        if ex < ENERGY_FLOOR {
            return (0.0, best, rxy);
        }
        let metric = rxy.norm() / (self.template_energy * ex).sqrt();
        (metric.min(1.0), best, rxy)
    }

    fn capture_peak(&self, best: usize, rxy: Complex32) -> Peak {
        let hypothesis = &self.bank[best];

        // Consecutive de-modulated terms differ by one sample of residual
        // carrier rotation
        let mut prev = Complex32::new(0.0, 0.0);
        let mut slope = Complex32::new(0.0, 0.0);
        for (r, s) in self.window().iter().zip(&hypothesis.taps) {
            let z = r * s;
            slope += z * prev.conj();
            prev = z;
        }
        let residual = if slope.norm_sqr() > 0.0 { slope.arg() } else { 0.0 };

        Peak {
            rxy,
            energy: self.energy.sum(),
            offset: hypothesis.offset,
            dphi: super::nco::wrap_phase(hypothesis.offset + residual),
        }
    }

    /// Called one sample past the peak with the metric for that sample
    fn finish(&self, rxy2: f32) -> Option<DetectionStats> {
        let peak = self.peak?;

        let denom = self.rxy0 - 2.0 * self.rxy1 + rxy2;
        let tau_hat = if denom < -1e-9 {
            (0.5 * (self.rxy0 - rxy2) / denom).clamp(-0.49, 0.49)
        } else {
            0.0
        };

        // The correlation phase is the carrier phase at the window start plus
        // half a window of residual rotation; the replay window starts `lead`
        // samples before the template.
        let n = self.template_len() as f32;
        let residual = peak.dphi - peak.offset;
        let phi_hat = super::nco::wrap_phase(
            peak.rxy.arg() - residual * 0.5 * (n - 1.0) - peak.dphi * self.lead as f32,
        );

        let gamma_hat = (peak.energy / self.template_energy).sqrt();

        Some(DetectionStats {
            tau_hat,
            dphi_hat: peak.dphi,
            phi_hat,
            gamma_hat,
            metric: self.rxy1,
        })
    }
}
