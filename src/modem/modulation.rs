//! Constellation mapping
//!
//! Gray-coded PSK and square QAM, all scaled to unit mean symbol energy.
//! Demodulation is a nearest-point search, which is exact for these
//! constellations and cheap at up to 64 points.

use std::f32::consts::PI;

use num_complex::Complex32;

use crate::domain::ModulationScheme;

/// Hard decision for one received sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub symbol: u8,
    /// Ideal constellation point for `symbol`
    pub point: Complex32,
    /// arg(received · conj(point)), radians
    pub phase_error: f32,
    /// |received - point|
    pub evm: f32,
}

/// Modulator/demodulator for one scheme
#[derive(Debug, Clone)]
pub struct Modem {
    scheme: ModulationScheme,
    /// Constellation point indexed by symbol value
    points: Vec<Complex32>,
}

fn gray(i: usize) -> usize {
    i ^ (i >> 1)
}

impl Modem {
    pub fn new(scheme: ModulationScheme) -> Self {
        let bits = scheme.bits_per_symbol();
        let order = 1usize << bits;
        let mut points = vec![Complex32::new(0.0, 0.0); order];

        match scheme {
            ModulationScheme::Bpsk | ModulationScheme::Qpsk | ModulationScheme::Psk8 => {
                let offset = if scheme == ModulationScheme::Qpsk { PI / 4.0 } else { 0.0 };
                for i in 0..order {
                    let angle = 2.0 * PI * i as f32 / order as f32 + offset;
                    points[gray(i)] = Complex32::from_polar(1.0, angle);
                }
            }
            ModulationScheme::Qam16 | ModulationScheme::Qam64 => {
                let half = bits / 2;
                let side = 1usize << half;
                let scale = (2.0 * (order as f32 - 1.0) / 3.0).sqrt().recip();
                let level = |i: usize| (2.0 * i as f32 - (side as f32 - 1.0)) * scale;
                for i in 0..side {
                    for q in 0..side {
                        let symbol = (gray(i) << half) | gray(q);
                        points[symbol] = Complex32::new(level(i), level(q));
                    }
                }
            }
        }

        Self { scheme, points }
    }

    pub fn scheme(&self) -> ModulationScheme {
        self.scheme
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.scheme.bits_per_symbol()
    }

    /// Number of constellation points
    pub fn order(&self) -> usize {
        self.points.len()
    }

    pub fn modulate(&self, symbol: u8) -> Complex32 {
        self.points[symbol as usize]
    }

    pub fn demodulate(&self, x: Complex32) -> Decision {
        let (symbol, point) = self
            .points
            .iter()
            .enumerate()
            .min_by(|a, b| (x - a.1).norm_sqr().total_cmp(&(x - b.1).norm_sqr()))
            .map(|(s, &p)| (s as u8, p))
            .unwrap_or((0, Complex32::new(1.0, 0.0)));

        let phase_error = if x.norm_sqr() > 0.0 {
            (x * point.conj()).arg()
        } else {
            0.0
        };

        Decision {
            symbol,
            point,
            phase_error,
            evm: (x - point).norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constellations_have_unit_energy() {
        for scheme in ModulationScheme::ALL {
            let modem = Modem::new(scheme);
            assert_eq!(modem.order(), 1 << scheme.bits_per_symbol());
            let energy: f32 = (0..modem.order())
                .map(|s| modem.modulate(s as u8).norm_sqr())
                .sum::<f32>()
                / modem.order() as f32;
            assert!((energy - 1.0).abs() < 1e-5, "{scheme:?} energy {energy}");
        }
    }

    #[test]
    fn test_noiseless_symbols_demodulate_exactly() {
        for scheme in ModulationScheme::ALL {
            let modem = Modem::new(scheme);
            for s in 0..modem.order() as u8 {
                let d = modem.demodulate(modem.modulate(s));
                assert_eq!(d.symbol, s, "{scheme:?}");
                assert!(d.evm < 1e-6);
                assert!(d.phase_error.abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_neighbours_differ_in_one_bit() {
        // Gray mapping: adjacent PSK points differ by a single bit
        let modem = Modem::new(ModulationScheme::Psk8);
        for s in 0..8u8 {
            let p = modem.modulate(s);
            let next = Complex32::from_polar(1.0, p.arg() + PI / 4.0);
            let n = modem.demodulate(next).symbol;
            assert_eq!((s ^ n).count_ones(), 1, "{s} -> {n}");
        }
    }

    #[test]
    fn test_reports_phase_error_sign() {
        let modem = Modem::new(ModulationScheme::Bpsk);
        let d = modem.demodulate(Complex32::from_polar(0.9, 0.2));
        assert_eq!(d.symbol, 0);
        assert!((d.phase_error - 0.2).abs() < 1e-5);

        let d = modem.demodulate(Complex32::from_polar(1.0, PI - 0.1));
        assert_eq!(d.point, modem.modulate(1));
        assert!((d.phase_error + 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_qam16_corners_are_outermost() {
        let modem = Modem::new(ModulationScheme::Qam16);
        let max = (0..16u8)
            .map(|s| modem.modulate(s).norm())
            .fold(0.0f32, f32::max);
        assert!((max - (18.0f32 / 10.0).sqrt()).abs() < 1e-5);
    }
}
