//! Link configuration
//!
//! A `FrameSyncConfig` describes both ends of a link: the generator and the
//! synchronizer must agree on pulse shape, preamble and header size. The
//! payload properties are what the generator sends and what the synchronizer
//! assumes until a header tells it otherwise.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{FrameSyncError, SyncResult};
use super::types::{CrcScheme, FecScheme, ModulationScheme};

/// Largest payload that fits in the 16-bit header length field
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Encoding of one payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayloadProperties {
    /// Payload length in bytes (before CRC/FEC)
    pub payload_len: usize,
    pub crc: CrcScheme,
    pub fec_inner: FecScheme,
    pub fec_outer: FecScheme,
    pub modulation: ModulationScheme,
}

impl Default for PayloadProperties {
    fn default() -> Self {
        Self {
            payload_len: 64,
            crc: CrcScheme::Crc32,
            fec_inner: FecScheme::None,
            fec_outer: FecScheme::None,
            modulation: ModulationScheme::Qpsk,
        }
    }
}

/// Adaptive equalizer algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualizerKind {
    Lms,
    Rls,
}

/// Multicarrier framing options
///
/// Carried so one configuration file can describe multicarrier links too.
/// Only validated here; the single-carrier synchronizer ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticarrierConfig {
    /// Number of subcarriers (even, at least 8)
    pub subcarriers: usize,
    pub cyclic_prefix_len: usize,
}

/// Complete link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSyncConfig {
    /// Samples per symbol (k)
    pub samples_per_symbol: usize,
    /// Pulse-shaping filter semi-length in symbols (m)
    pub filter_semi_length: usize,
    /// Root raised-cosine excess bandwidth (beta)
    pub excess_bandwidth: f32,
    /// Polyphase branches used by timing recovery
    pub num_filters: usize,
    /// Normalized correlation level that triggers a detection
    pub detection_threshold: f32,
    /// Largest carrier offset searched by the detector, radians/sample
    pub dphi_max: f32,
    /// Caller-defined header bytes carried ahead of the protocol fields
    pub header_user_len: usize,
    /// Timing loop bandwidth
    pub timing_bandwidth: f32,
    /// Fine carrier PLL bandwidth (symbol rate)
    pub pll_bandwidth: f32,
    pub equalizer: EqualizerKind,
    pub equalizer_len: usize,
    /// LMS step size, or RLS forgetting factor complement (1 - lambda)
    pub equalizer_mu: f32,
    /// Freeze the timing loop once the header has been accepted
    pub lock_timing_on_payload: bool,
    pub payload: PayloadProperties,
    pub multicarrier: Option<MulticarrierConfig>,
}

impl Default for FrameSyncConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: 2,
            filter_semi_length: 7,
            excess_bandwidth: 0.25,
            num_filters: 32,
            detection_threshold: 0.5,
            dphi_max: 0.05,
            header_user_len: 8,
            timing_bandwidth: 0.1,
            pll_bandwidth: 0.02,
            equalizer: EqualizerKind::Lms,
            equalizer_len: 4,
            equalizer_mu: 0.05,
            lock_timing_on_payload: true,
            payload: PayloadProperties::default(),
            multicarrier: None,
        }
    }
}

impl FrameSyncConfig {
    /// Check every option, returning the first violation found
    pub fn validate(&self) -> SyncResult<()> {
        if self.samples_per_symbol < 2 {
            return Err(invalid(format!(
                "samples_per_symbol must be at least 2 (got {})",
                self.samples_per_symbol
            )));
        }
        if self.filter_semi_length < 1 {
            return Err(invalid("filter_semi_length must be at least 1".into()));
        }
        if !(self.excess_bandwidth > 0.0 && self.excess_bandwidth <= 1.0) {
            return Err(invalid(format!(
                "excess_bandwidth must be in (0, 1] (got {})",
                self.excess_bandwidth
            )));
        }
        if self.num_filters < 1 {
            return Err(invalid("num_filters must be at least 1".into()));
        }
        if !(self.detection_threshold > 0.0 && self.detection_threshold <= 1.0) {
            return Err(invalid(format!(
                "detection_threshold must be in (0, 1] (got {})",
                self.detection_threshold
            )));
        }
        if !(self.dphi_max >= 0.0 && self.dphi_max < std::f32::consts::PI) {
            return Err(invalid(format!(
                "dphi_max must be in [0, pi) (got {})",
                self.dphi_max
            )));
        }
        if !(self.timing_bandwidth > 0.0 && self.timing_bandwidth < 1.0) {
            return Err(invalid(format!(
                "timing_bandwidth must be in (0, 1) (got {})",
                self.timing_bandwidth
            )));
        }
        if !(self.pll_bandwidth > 0.0 && self.pll_bandwidth < 1.0) {
            return Err(invalid(format!(
                "pll_bandwidth must be in (0, 1) (got {})",
                self.pll_bandwidth
            )));
        }
        if self.equalizer_len < 1 {
            return Err(invalid("equalizer_len must be at least 1".into()));
        }
        if !(self.equalizer_mu >= 0.0 && self.equalizer_mu < 1.0) {
            return Err(invalid(format!(
                "equalizer_mu must be in [0, 1) (got {})",
                self.equalizer_mu
            )));
        }
        if self.payload.payload_len > MAX_PAYLOAD_LEN {
            return Err(invalid(format!(
                "payload_len {} exceeds {MAX_PAYLOAD_LEN}",
                self.payload.payload_len
            )));
        }
        if let Some(mc) = &self.multicarrier {
            if mc.subcarriers < 8 || mc.subcarriers % 2 != 0 {
                return Err(invalid(format!(
                    "subcarriers must be even and at least 8 (got {})",
                    mc.subcarriers
                )));
            }
            if mc.cyclic_prefix_len > mc.subcarriers {
                return Err(invalid(format!(
                    "cyclic_prefix_len {} exceeds subcarrier count {}",
                    mc.cyclic_prefix_len, mc.subcarriers
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::debug!("Loaded link configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn invalid(msg: String) -> FrameSyncError {
    FrameSyncError::Config(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_valid() {
        let config = FrameSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_symbol, 2);
        assert_eq!(config.filter_semi_length, 7);
        assert_eq!(config.detection_threshold, 0.5);
        assert_eq!(config.dphi_max, 0.05);
    }

    #[test]
    fn test_rejects_single_sample_per_symbol() {
        let config = FrameSyncConfig {
            samples_per_symbol: 1,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("samples_per_symbol"), "{err}");
    }

    #[test]
    fn test_rejects_zero_filter_length() {
        let config = FrameSyncConfig {
            filter_semi_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FrameSyncError::Config(_))));
    }

    #[test]
    fn test_rejects_out_of_range_bandwidth_and_threshold() {
        for beta in [0.0, -0.1, 1.5, f32::NAN] {
            let config = FrameSyncConfig {
                excess_bandwidth: beta,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "beta {beta} accepted");
        }
        for threshold in [0.0, 1.01] {
            let config = FrameSyncConfig {
                detection_threshold: threshold,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "threshold {threshold} accepted");
        }
        let config = FrameSyncConfig {
            detection_threshold: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_carrier_search() {
        for dphi_max in [-0.01, 3.5, f32::NAN] {
            let config = FrameSyncConfig {
                dphi_max,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("dphi_max"), "{err}");
        }
        let config = FrameSyncConfig {
            dphi_max: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_odd_subcarrier_count() {
        let config = FrameSyncConfig {
            multicarrier: Some(MulticarrierConfig {
                subcarriers: 63,
                cyclic_prefix_len: 16,
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("subcarriers"), "{err}");

        let config = FrameSyncConfig {
            multicarrier: Some(MulticarrierConfig {
                subcarriers: 64,
                cyclic_prefix_len: 16,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let mut config = FrameSyncConfig::default();
        config.payload.payload_len = MAX_PAYLOAD_LEN + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            FrameSyncConfig::from_json(r#"{"samples_per_symbol": 4, "excess_bandwidth": 0.3}"#)
                .unwrap();
        assert_eq!(config.samples_per_symbol, 4);
        assert_eq!(config.excess_bandwidth, 0.3);
        assert_eq!(config.filter_semi_length, 7);
        assert_eq!(config.payload, PayloadProperties::default());
    }

    #[test]
    fn test_invalid_json_values_are_rejected_on_load() {
        let err = FrameSyncConfig::from_json(r#"{"samples_per_symbol": 1}"#).unwrap_err();
        assert!(matches!(err, FrameSyncError::Config(_)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.json");

        let mut config = FrameSyncConfig::default();
        config.header_user_len = 12;
        config.payload.fec_inner = FecScheme::Golay2412;
        config.payload.modulation = ModulationScheme::Qam16;
        config.save(&path).unwrap();

        let loaded = FrameSyncConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FrameSyncConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FrameSyncError::Io(_)));
    }
}
