//! Shared helpers for the loopback tests: a seeded baseband channel model
//! and test logging.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use flexsync_lib::adapters::FrameReport;
use flexsync_lib::ports::Frame;
use num_complex::Complex32;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Impairments applied between generator and synchronizer
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub gain: f32,
    /// Carrier phase, radians
    pub phase: f32,
    /// Carrier frequency offset, radians/sample
    pub cfo: f32,
    /// Fractional timing offset, samples
    pub delay: f32,
    /// Signal-to-noise ratio per sample; `None` for a noiseless channel
    pub snr_db: Option<f32>,
    pub seed: u64,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            gain: 1.0,
            phase: 0.0,
            cfo: 0.0,
            delay: 0.0,
            snr_db: None,
            seed: 1,
        }
    }
}

impl Channel {
    pub fn with_snr(snr_db: f32, seed: u64) -> Self {
        Self {
            snr_db: Some(snr_db),
            seed,
            ..Default::default()
        }
    }

    /// Impair a sample stream. Output is longer than the input when a
    /// fractional delay is applied.
    pub fn apply(&self, input: &[Complex32]) -> Vec<Complex32> {
        let delayed = if self.delay != 0.0 {
            fractional_delay(input, self.delay)
        } else {
            input.to_vec()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let noise = self.snr_db.map(|snr| {
            let variance = self.gain * self.gain * 10f32.powf(-snr / 10.0);
            Normal::new(0.0f32, (variance / 2.0).sqrt()).unwrap()
        });

        delayed
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let carrier = Complex32::from_polar(self.gain, self.phase + self.cfo * i as f32);
                let mut y = x * carrier;
                if let Some(dist) = &noise {
                    y += Complex32::new(dist.sample(&mut rng), dist.sample(&mut rng));
                }
                y
            })
            .collect()
    }
}

/// Delay by `15 + delay` samples with a 31-tap Blackman-windowed sinc
pub fn fractional_delay(input: &[Complex32], delay: f32) -> Vec<Complex32> {
    const TAPS: usize = 31;
    let center = (TAPS - 1) as f32 / 2.0;
    let mut h: Vec<f32> = (0..TAPS)
        .map(|n| {
            let t = n as f32 - center - delay;
            let sinc = if t.abs() < 1e-6 { 1.0 } else { (PI * t).sin() / (PI * t) };
            let w = 2.0 * PI * n as f32 / (TAPS - 1) as f32;
            sinc * (0.42 - 0.5 * w.cos() + 0.08 * (2.0 * w).cos())
        })
        .collect();
    let sum: f32 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= sum);

    (0..input.len() + TAPS - 1)
        .map(|t| {
            h.iter()
                .enumerate()
                .filter_map(|(n, &c)| t.checked_sub(n).and_then(|i| input.get(i)).map(|x| *x * c))
                .sum()
        })
        .collect()
}

/// Zero padding around a frame (the channel turns it into a noise floor)
pub fn padded(frame: &[Complex32], before: usize, after: usize) -> Vec<Complex32> {
    let zero = Complex32::new(0.0, 0.0);
    let mut out = vec![zero; before];
    out.extend_from_slice(frame);
    out.resize(out.len() + after, zero);
    out
}

/// Deterministic payload bytes
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(73).wrapping_add(seed) ^ 0x5a)
        .collect()
}

pub type Reports = Arc<Mutex<Vec<FrameReport>>>;

/// Handler collecting every frame it sees
pub fn collector() -> (Reports, impl FnMut(&Frame<'_>) -> i32 + Send) {
    let reports: Reports = Arc::default();
    let sink = Arc::clone(&reports);
    let handler = move |frame: &Frame<'_>| {
        sink.lock().unwrap().push(FrameReport::from(frame));
        0
    };
    (reports, handler)
}
