//! Numerically Controlled Oscillator with phase-locked loop
//!
//! Frequencies are normalized (radians per sample, or per symbol when the
//! oscillator runs at symbol rate). Phase is kept in (-π, π].

use std::f32::consts::PI;

use num_complex::Complex32;

/// Complex oscillator used to mix carrier offsets out of a sample stream
#[derive(Debug, Clone)]
pub struct Nco {
    phase: f32,
    frequency: f32,
    /// PLL frequency gain
    alpha: f32,
    /// PLL phase gain
    beta: f32,
}

impl Nco {
    /// Create an oscillator at `frequency` radians/sample, zero phase
    pub fn new(frequency: f32) -> Self {
        let mut nco = Self {
            phase: 0.0,
            frequency,
            alpha: 0.0,
            beta: 0.0,
        };
        nco.pll_set_bandwidth(0.1);
        nco
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn adjust_frequency(&mut self, delta: f32) {
        self.frequency += delta;
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap_phase(phase);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Adjust phase by a delta (used by the PLL)
    pub fn adjust_phase(&mut self, delta: f32) {
        self.phase = wrap_phase(self.phase + delta);
    }

    /// Advance the phase by one sample
    pub fn step(&mut self) {
        self.phase = wrap_phase(self.phase + self.frequency);
    }

    /// Current oscillator output, exp(jθ)
    pub fn cexp(&self) -> Complex32 {
        Complex32::from_polar(1.0, self.phase)
    }

    /// Rotate `x` by exp(+jθ). Does not advance the phase.
    pub fn mix_up(&self, x: Complex32) -> Complex32 {
        x * self.cexp()
    }

    /// Rotate `x` by exp(-jθ). Does not advance the phase.
    pub fn mix_down(&self, x: Complex32) -> Complex32 {
        x * self.cexp().conj()
    }

    /// Mix a block down, stepping once per sample
    pub fn mix_block_down(&mut self, input: &[Complex32], output: &mut [Complex32]) {
        assert_eq!(input.len(), output.len(), "mix block length mismatch");
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.mix_down(*x);
            self.step();
        }
    }

    /// Set the loop bandwidth. Frequency gain is `bw`, phase gain `sqrt(bw)`,
    /// which gives a damping factor of 0.5.
    pub fn pll_set_bandwidth(&mut self, bw: f32) {
        assert!(bw > 0.0, "PLL bandwidth must be positive (got {bw})");
        self.alpha = bw;
        self.beta = bw.sqrt();
    }

    /// Steer the oscillator from a phase error (received minus reference)
    pub fn pll_step(&mut self, phase_error: f32) {
        self.adjust_frequency(phase_error * self.alpha);
        self.adjust_phase(phase_error * self.beta);
    }

    /// Reset phase and frequency to zero. Loop gains are kept.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.frequency = 0.0;
    }
}

/// Wrap an angle into (-π, π]
pub fn wrap_phase(mut phase: f32) -> f32 {
    while phase > PI {
        phase -= 2.0 * PI;
    }
    while phase <= -PI {
        phase += 2.0 * PI;
    }
    phase
}
