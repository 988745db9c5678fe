//! Frame handler that forwards owned copies of each frame to another thread

use crossbeam_channel::{Receiver, Sender};
use num_complex::Complex32;
use serde::Serialize;

use crate::domain::FrameStats;
use crate::ports::{Frame, FrameHandler};

/// Owned copy of a [`Frame`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub header: Vec<u8>,
    pub header_valid: bool,
    pub payload: Option<Vec<u8>>,
    pub payload_valid: bool,
    /// Equalized payload symbols as (re, im) pairs
    pub symbols: Vec<(f32, f32)>,
    pub stats: FrameStats,
}

impl From<&Frame<'_>> for FrameReport {
    fn from(frame: &Frame<'_>) -> Self {
        Self {
            header: frame.header.to_vec(),
            header_valid: frame.header_valid,
            payload: frame.payload.map(<[u8]>::to_vec),
            payload_valid: frame.payload_valid,
            symbols: frame.symbols.iter().map(|s: &Complex32| (s.re, s.im)).collect(),
            stats: frame.stats,
        }
    }
}

/// Sends a [`FrameReport`] per frame. Returns -1 from the handler once the
/// receiving side has hung up.
pub struct ChannelSink {
    tx: Sender<FrameReport>,
}

impl ChannelSink {
    pub fn new(tx: Sender<FrameReport>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end of an unbounded channel
    pub fn unbounded() -> (Self, Receiver<FrameReport>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl FrameHandler for ChannelSink {
    fn on_frame(&mut self, frame: &Frame<'_>) -> i32 {
        match self.tx.send(FrameReport::from(frame)) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame<'a>(header: &'a [u8], payload: &'a [u8]) -> Frame<'a> {
        Frame {
            header,
            header_valid: true,
            payload: Some(payload),
            payload_valid: false,
            symbols: &[],
            stats: FrameStats::default(),
        }
    }

    #[test]
    fn test_forwards_owned_copy() {
        let (mut sink, rx) = ChannelSink::unbounded();
        assert_eq!(sink.on_frame(&frame(&[1, 2], &[3])), 0);
        let report = rx.try_recv().unwrap();
        assert_eq!(report.header, vec![1, 2]);
        assert_eq!(report.payload, Some(vec![3]));
        assert!(!report.payload_valid);
    }

    #[test]
    fn test_disconnected_receiver_reports_failure() {
        let (mut sink, rx) = ChannelSink::unbounded();
        drop(rx);
        assert_eq!(sink.on_frame(&frame(&[], &[])), -1);
    }

    #[test]
    fn test_report_serializes() {
        let report = FrameReport::from(&frame(&[9], &[]));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"header_valid\":true"), "{json}");
    }
}
