//! Root raised-cosine pulse design
//!
//! Pure functions returning coefficient vectors. Callers scale the unit-energy
//! prototype to whatever gain their stage needs.

use std::f32::consts::{PI, SQRT_2};

/// Root raised-cosine filter, `2*k*m + 1` taps, unit energy.
///
/// - `k`: samples per symbol
/// - `m`: filter semi-length in symbols
/// - `beta`: excess bandwidth in (0, 1]
/// - `delay`: fractional delay in samples, positive moves the peak later
pub fn root_raised_cosine(k: usize, m: usize, beta: f32, delay: f32) -> Vec<f32> {
    let len = 2 * k * m + 1;
    let center = (k * m) as f32;

    let mut taps: Vec<f32> = (0..len)
        .map(|i| rrc_impulse((i as f32 - center - delay) / k as f32, beta))
        .collect();

    let energy: f32 = taps.iter().map(|h| h * h).sum();
    if energy > 0.0 {
        let scale = energy.sqrt().recip();
        taps.iter_mut().for_each(|h| *h *= scale);
    }
    taps
}

/// Transmit pulse for `k` samples/symbol with unit average output power
/// when driven by unit-energy symbols.
pub fn transmit_taps(k: usize, m: usize, beta: f32) -> Vec<f32> {
    let gain = (k as f32).sqrt();
    root_raised_cosine(k, m, beta, 0.0)
        .into_iter()
        .map(|h| h * gain)
        .collect()
}

/// Continuous root raised-cosine impulse response at `t` symbol periods
fn rrc_impulse(t: f32, beta: f32) -> f32 {
    const TOL: f32 = 1e-5;

    if t.abs() < TOL {
        return 1.0 - beta + 4.0 * beta / PI;
    }

    // Removable singularity at |t| = 1/(4 beta)
    let singular = 1.0 / (4.0 * beta);
    if (t.abs() - singular).abs() < TOL {
        let arg = PI / (4.0 * beta);
        return beta / SQRT_2
            * ((1.0 + 2.0 / PI) * arg.sin() + (1.0 - 2.0 / PI) * arg.cos());
    }

    let num = (PI * t * (1.0 - beta)).sin() + 4.0 * beta * t * (PI * t * (1.0 + beta)).cos();
    let den = PI * t * (1.0 - (4.0 * beta * t).powi(2));
    num / den
}
