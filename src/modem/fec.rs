//! Forward error correction
//!
//! Block codes only, hard decision. Every scheme maps `n` message bytes to
//! a fixed `encoded_len(n)` bytes, so frame lengths stay a pure function of
//! configuration. Decoding always returns `n` best-effort bytes; the CRC
//! decides validity.

use super::bits::{BitReader, BitWriter};
use crate::domain::FecScheme;

impl FecScheme {
    /// Encoded length in bytes of an `n`-byte message
    pub fn encoded_len(self, n: usize) -> usize {
        match self {
            FecScheme::None => n,
            FecScheme::Repeat3 => 3 * n,
            FecScheme::Repeat5 => 5 * n,
            FecScheme::Hamming74 => (14 * n).div_ceil(8),
            FecScheme::Hamming84 => 2 * n,
            FecScheme::Golay2412 => 3 * (8 * n).div_ceil(12),
        }
    }

    /// Code rate k/n (asymptotic for bit-packed codes)
    pub fn rate(self) -> f32 {
        match self {
            FecScheme::None => 1.0,
            FecScheme::Repeat3 => 1.0 / 3.0,
            FecScheme::Repeat5 => 1.0 / 5.0,
            FecScheme::Hamming74 => 4.0 / 7.0,
            FecScheme::Hamming84 | FecScheme::Golay2412 => 0.5,
        }
    }

    pub fn encode(self, msg: &[u8]) -> Vec<u8> {
        match self {
            FecScheme::None => msg.to_vec(),
            FecScheme::Repeat3 => msg.repeat(3),
            FecScheme::Repeat5 => msg.repeat(5),
            FecScheme::Hamming74 => {
                let mut w = BitWriter::with_capacity(self.encoded_len(msg.len()));
                for &b in msg {
                    w.push(hamming74_encode(b >> 4) as u32, 7);
                    w.push(hamming74_encode(b & 0x0f) as u32, 7);
                }
                w.into_bytes()
            }
            FecScheme::Hamming84 => msg
                .iter()
                .flat_map(|&b| [hamming84_encode(b >> 4), hamming84_encode(b & 0x0f)])
                .collect(),
            FecScheme::Golay2412 => {
                let blocks = (8 * msg.len()).div_ceil(12);
                let mut r = BitReader::new(msg);
                let mut w = BitWriter::with_capacity(3 * blocks);
                for _ in 0..blocks {
                    w.push(golay_encode(r.read(12) as u16), 24);
                }
                w.into_bytes()
            }
        }
    }

    /// Decode `encoded` back to an `n`-byte message
    ///
    /// # Panics
    /// If `encoded.len() != self.encoded_len(n)`.
    pub fn decode(self, encoded: &[u8], n: usize) -> Vec<u8> {
        assert_eq!(
            encoded.len(),
            self.encoded_len(n),
            "{self:?} decode expects {} encoded bytes for {n} message bytes",
            self.encoded_len(n)
        );
        match self {
            FecScheme::None => encoded.to_vec(),
            FecScheme::Repeat3 => majority(encoded, n, 3),
            FecScheme::Repeat5 => majority(encoded, n, 5),
            FecScheme::Hamming74 => {
                let mut r = BitReader::new(encoded);
                (0..n)
                    .map(|_| {
                        let hi = hamming74_decode(r.read(7) as u8);
                        let lo = hamming74_decode(r.read(7) as u8);
                        (hi << 4) | lo
                    })
                    .collect()
            }
            FecScheme::Hamming84 => encoded
                .chunks_exact(2)
                .map(|pair| (hamming84_decode(pair[0]) << 4) | hamming84_decode(pair[1]))
                .collect(),
            FecScheme::Golay2412 => {
                let mut r = BitReader::new(encoded);
                let mut w = BitWriter::with_capacity(n + 2);
                for _ in 0..encoded.len() / 3 {
                    w.push(golay_decode(r.read(24)) as u32, 12);
                }
                let mut out = w.into_bytes();
                out.resize(n, 0);
                out
            }
        }
    }
}

/// Bitwise majority over `copies` consecutive repetitions of an `n`-byte message
fn majority(encoded: &[u8], n: usize, copies: usize) -> Vec<u8> {
    (0..n)
        .map(|i| {
            (0..8).fold(0u8, |byte, bit| {
                let votes = (0..copies)
                    .filter(|c| encoded[c * n + i] & (1 << bit) != 0)
                    .count();
                if 2 * votes > copies {
                    byte | (1 << bit)
                } else {
                    byte
                }
            })
        })
        .collect()
}

// Hamming(7,4): data nibble in the high four bits, three parity bits below

fn hamming74_encode(d: u8) -> u8 {
    let bit = |i: u8| (d >> i) & 1;
    let p0 = bit(0) ^ bit(1) ^ bit(3);
    let p1 = bit(0) ^ bit(2) ^ bit(3);
    let p2 = bit(1) ^ bit(2) ^ bit(3);
    ((d & 0x0f) << 3) | (p2 << 2) | (p1 << 1) | p0
}

fn hamming84_encode(d: u8) -> u8 {
    let c = hamming74_encode(d);
    (c << 1) | (c.count_ones() as u8 & 1)
}

/// Nearest codeword among the 16 candidates
fn nearest_nibble(received: u8, encode: fn(u8) -> u8) -> u8 {
    (0..16u8)
        .min_by_key(|&d| (encode(d) ^ received).count_ones())
        .unwrap_or(0)
}

fn hamming74_decode(received: u8) -> u8 {
    nearest_nibble(received & 0x7f, hamming74_encode)
}

fn hamming84_decode(received: u8) -> u8 {
    nearest_nibble(received, hamming84_encode)
}

// Extended Golay (24,12): codeword (u, uB) with B symmetric and B·B = I.
// Bit 11 of each row is column 0.

const GOLAY_B: [u16; 12] = [
    0b110111000101,
    0b101110001011,
    0b011100010111,
    0b111000101101,
    0b110001011011,
    0b100010110111,
    0b000101101111,
    0b001011011101,
    0b010110111001,
    0b101101110001,
    0b011011100011,
    0b111111111110,
];

/// Row vector times B
fn times_b(v: u16) -> u16 {
    GOLAY_B
        .iter()
        .enumerate()
        .filter(|(i, _)| v & (1 << (11 - i)) != 0)
        .fold(0, |acc, (_, row)| acc ^ row)
}

fn golay_encode(u: u16) -> u32 {
    let u = u & 0x0fff;
    ((u as u32) << 12) | times_b(u) as u32
}

fn weight(v: u16) -> u32 {
    v.count_ones()
}

/// Returns the 12 message bits, corrected when at most three bits are in error
fn golay_decode(r: u32) -> u16 {
    let r1 = ((r >> 12) & 0x0fff) as u16;
    let r2 = (r & 0x0fff) as u16;
    let s = times_b(r1) ^ r2;

    // Error pattern on the message half only; parity-half errors don't matter
    let e1 = if weight(s) <= 3 {
        Some(0)
    } else if let Some(i) = (0..12).find(|&i| weight(s ^ GOLAY_B[i]) <= 2) {
        Some(1 << (11 - i))
    } else {
        let sb = times_b(s);
        if weight(sb) <= 3 {
            Some(sb)
        } else {
            (0..12)
                .find(|&i| weight(sb ^ GOLAY_B[i]) <= 2)
                .map(|i| sb ^ GOLAY_B[i])
        }
    };

    match e1 {
        Some(e) => r1 ^ e,
        None => r1,
    }
}
