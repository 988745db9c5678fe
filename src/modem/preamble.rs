//! Frame preamble
//!
//! 64 BPSK symbols from a degree-6 maximal-length sequence (63 chips, the
//! first repeated). The synchronizer correlates against the pulse-shaped
//! version; both tables are built once and shared read-only.

use std::sync::Arc;

use num_complex::Complex32;

use crate::dsp::raised_cosine::transmit_taps;

/// Preamble length in symbols
pub const PREAMBLE_LEN: usize = 64;

/// Feedback taps for x^6 + x + 1
const MSEQ_TAPS: u32 = 0x21;
const MSEQ_DEGREE: u32 = 6;

/// Fibonacci LFSR producing a maximal-length binary sequence
#[derive(Debug, Clone)]
pub struct MSequence {
    taps: u32,
    mask: u32,
    state: u32,
}

impl MSequence {
    pub fn new(degree: u32, taps: u32) -> Self {
        let mask = (1u32 << degree) - 1;
        Self {
            taps: taps & mask,
            mask,
            state: 1,
        }
    }

    pub fn advance(&mut self) -> u8 {
        let bit = (self.state & self.taps).count_ones() & 1;
        self.state = ((self.state << 1) | bit) & self.mask;
        bit as u8
    }
}

/// Preamble symbols and their pulse-shaped correlation template
#[derive(Debug, Clone)]
pub struct Preamble {
    symbols: Arc<[f32]>,
    template: Arc<[Complex32]>,
}

impl Preamble {
    /// Preamble for an RRC link with `k` samples/symbol, semi-length `m`
    pub fn new(k: usize, m: usize, beta: f32) -> Self {
        let mut seq = MSequence::new(MSEQ_DEGREE, MSEQ_TAPS);
        let period = (1usize << MSEQ_DEGREE) - 1;
        let mut symbols: Vec<f32> = (0..period)
            .map(|_| if seq.advance() == 1 { -1.0 } else { 1.0 })
            .collect();
        symbols.resize(PREAMBLE_LEN, symbols[0]);

        // Transmitted waveform over [k*m, k*m + k*L): symbol 0 peaks at
        // template sample 0
        let g = transmit_taps(k, m, beta);
        let template: Vec<Complex32> = (0..k * PREAMBLE_LEN)
            .map(|j| {
                let re: f32 = symbols
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &s)| {
                        let tap = (j + k * m).checked_sub(k * i)?;
                        g.get(tap).map(|h| s * h)
                    })
                    .sum();
                Complex32::new(re, 0.0)
            })
            .collect();

        Self {
            symbols: symbols.into(),
            template: template.into(),
        }
    }

    /// Preamble symbols, ±1
    pub fn symbols(&self) -> &[f32] {
        &self.symbols
    }

    /// Pulse-shaped preamble, `k * PREAMBLE_LEN` samples
    pub fn template(&self) -> &[Complex32] {
        &self.template
    }
}
