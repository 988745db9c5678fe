//! Receiver tracing port
//!
//! Every method has an empty default, so an observer only implements the
//! events it cares about.

use crate::domain::{DetectionStats, FrameStats, PayloadProperties};
use crate::modem::header::HeaderFault;

pub trait SyncObserver: Send {
    /// Preamble found; carrier and timing loops seeded from `stats`
    fn frame_detected(&mut self, _stats: &DetectionStats) {}

    /// Fine carrier estimate from the received preamble, radians/symbol and radians
    fn preamble_synchronized(&mut self, _dphi: f32, _phase: f32) {}

    fn header_decoded(&mut self, _props: &PayloadProperties) {}

    fn header_rejected(&mut self, _fault: HeaderFault) {}

    fn payload_decoded(&mut self, _valid: bool, _stats: &FrameStats) {}

    /// Frame handler returned a non-zero status
    fn callback_returned(&mut self, _status: i32) {}

    /// Synchronizer reset by its owner
    fn reset(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {}
