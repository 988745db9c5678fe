//! Core domain types for frame synchronization

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// Complex baseband sample flowing through the receive pipeline
pub type ComplexSample = Complex32;

/// Error-detection scheme appended to a packet before FEC
///
/// The numeric ids are carried on air (3 bits in the frame header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrcScheme {
    None,
    Checksum,
    Crc8,
    Crc16,
    Crc24,
    Crc32,
}

impl CrcScheme {
    pub const ALL: [CrcScheme; 6] = [
        CrcScheme::None,
        CrcScheme::Checksum,
        CrcScheme::Crc8,
        CrcScheme::Crc16,
        CrcScheme::Crc24,
        CrcScheme::Crc32,
    ];

    /// Identifier used in the frame header
    pub fn id(self) -> u8 {
        match self {
            CrcScheme::None => 0,
            CrcScheme::Checksum => 1,
            CrcScheme::Crc8 => 2,
            CrcScheme::Crc16 => 3,
            CrcScheme::Crc24 => 4,
            CrcScheme::Crc32 => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

/// Forward error correction scheme
///
/// The numeric ids are carried on air (5 bits in the frame header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FecScheme {
    None,
    /// Message sent three times, bitwise majority vote
    Repeat3,
    /// Message sent five times, bitwise majority vote
    Repeat5,
    Hamming74,
    /// Hamming(7,4) extended with an overall parity bit
    Hamming84,
    /// Extended binary Golay code, corrects up to 3 errors per 24-bit block
    Golay2412,
}

impl FecScheme {
    pub const ALL: [FecScheme; 6] = [
        FecScheme::None,
        FecScheme::Repeat3,
        FecScheme::Repeat5,
        FecScheme::Hamming74,
        FecScheme::Hamming84,
        FecScheme::Golay2412,
    ];

    pub fn id(self) -> u8 {
        match self {
            FecScheme::None => 0,
            FecScheme::Repeat3 => 1,
            FecScheme::Repeat5 => 2,
            FecScheme::Hamming74 => 3,
            FecScheme::Hamming84 => 4,
            FecScheme::Golay2412 => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

/// Linear modulation scheme for header and payload symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationScheme {
    Bpsk,
    Qpsk,
    Psk8,
    Qam16,
    Qam64,
}

impl ModulationScheme {
    pub const ALL: [ModulationScheme; 5] = [
        ModulationScheme::Bpsk,
        ModulationScheme::Qpsk,
        ModulationScheme::Psk8,
        ModulationScheme::Qam16,
        ModulationScheme::Qam64,
    ];

    /// Bits carried by one symbol
    pub fn bits_per_symbol(self) -> usize {
        match self {
            ModulationScheme::Bpsk => 1,
            ModulationScheme::Qpsk => 2,
            ModulationScheme::Psk8 => 3,
            ModulationScheme::Qam16 => 4,
            ModulationScheme::Qam64 => 6,
        }
    }

    /// Identifier used in the frame header. Zero is reserved for "unknown".
    pub fn id(self) -> u8 {
        match self {
            ModulationScheme::Bpsk => 1,
            ModulationScheme::Qpsk => 2,
            ModulationScheme::Psk8 => 3,
            ModulationScheme::Qam16 => 4,
            ModulationScheme::Qam64 => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

/// Estimates produced by the preamble detector for one detection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DetectionStats {
    /// Fractional timing offset of the correlation peak, in samples (-0.5, 0.5)
    pub tau_hat: f32,
    /// Carrier frequency offset, radians/sample
    pub dphi_hat: f32,
    /// Carrier phase at the first sample of the replay window, radians
    pub phi_hat: f32,
    /// Channel gain magnitude
    pub gamma_hat: f32,
    /// Normalized correlation magnitude at the peak, in [0, 1]
    pub metric: f32,
}

/// Per-frame diagnostics handed to the frame callback
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FrameStats {
    /// Received signal level, 20·log10(gamma_hat) dB
    pub rssi: f32,
    /// Carrier frequency offset estimate, radians/sample
    pub cfo: f32,
    /// Mean error vector magnitude over header and payload symbols, dB
    pub evm: f32,
    pub modulation: Option<ModulationScheme>,
    pub fec_inner: Option<FecScheme>,
    pub fec_outer: Option<FecScheme>,
    pub check: Option<CrcScheme>,
}

/// Cumulative reception counters
///
/// Monotonically non-decreasing until `FrameSynchronizer::reset_framedatastats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameDataStats {
    pub frames_detected: u64,
    pub headers_valid: u64,
    pub payloads_valid: u64,
    pub bytes_received: u64,
}

/// Receive state of a frame synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FrameSyncState {
    /// Searching for a preamble
    #[default]
    Detect,
    /// Receiving preamble and header symbols
    RxHeader,
    /// Receiving payload symbols
    RxPayload,
}
