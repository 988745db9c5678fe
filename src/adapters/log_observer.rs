//! Observer that traces the receiver through the `log` facade
//!
//! Enable with e.g. `RUST_LOG=flexsync_lib=debug`. Detections and decodes are
//! DEBUG; rejected headers and failed payloads are WARN.

use crate::domain::{DetectionStats, FrameStats, PayloadProperties};
use crate::modem::header::HeaderFault;
use crate::ports::SyncObserver;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn frame_detected(&mut self, stats: &DetectionStats) {
        log::debug!(
            "[FRAMESYNC] detected: metric={:.3} tau={:+.3} dphi={:+.5} phi={:+.3} gamma={:.3}",
            stats.metric,
            stats.tau_hat,
            stats.dphi_hat,
            stats.phi_hat,
            stats.gamma_hat
        );
    }

    fn preamble_synchronized(&mut self, dphi: f32, phase: f32) {
        log::debug!("[FRAMESYNC] preamble: fine dphi={dphi:+.5} rad/sym, phase={phase:+.3}");
    }

    fn header_decoded(&mut self, props: &PayloadProperties) {
        log::debug!(
            "[FRAMESYNC] header: {} bytes, {:?}, crc={:?}, fec={:?}/{:?}",
            props.payload_len,
            props.modulation,
            props.crc,
            props.fec_inner,
            props.fec_outer
        );
    }

    fn header_rejected(&mut self, fault: HeaderFault) {
        log::warn!("[FRAMESYNC] header rejected: {fault}");
    }

    fn payload_decoded(&mut self, valid: bool, stats: &FrameStats) {
        if valid {
            log::debug!(
                "[FRAMESYNC] payload ok: rssi={:.1} dB, cfo={:+.5}, evm={:.1} dB",
                stats.rssi,
                stats.cfo,
                stats.evm
            );
        } else {
            log::warn!(
                "[FRAMESYNC] payload failed check: rssi={:.1} dB, evm={:.1} dB",
                stats.rssi,
                stats.evm
            );
        }
    }

    fn callback_returned(&mut self, status: i32) {
        log::warn!("[FRAMESYNC] frame handler returned {status}");
    }

    fn reset(&mut self) {
        log::debug!("[FRAMESYNC] reset");
    }
}
