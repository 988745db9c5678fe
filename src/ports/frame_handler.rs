//! Frame delivery port

use num_complex::Complex32;

use crate::domain::FrameStats;

/// Everything known about one received frame attempt
///
/// Borrowed from the synchronizer's buffers for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Caller header bytes (protocol fields stripped), best effort when invalid
    pub header: &'a [u8],
    pub header_valid: bool,
    /// Decoded payload; `None` when the header was rejected
    pub payload: Option<&'a [u8]>,
    pub payload_valid: bool,
    /// Equalized payload symbols
    pub symbols: &'a [Complex32],
    pub stats: FrameStats,
}

/// Receives frames from a synchronizer
///
/// Called synchronously from inside `FrameSynchronizer::execute`, at most once
/// per frame attempt. The return value is passed to the observer; zero means
/// success.
pub trait FrameHandler: Send {
    fn on_frame(&mut self, frame: &Frame<'_>) -> i32;
}

impl<F> FrameHandler for F
where
    F: FnMut(&Frame<'_>) -> i32 + Send,
{
    fn on_frame(&mut self, frame: &Frame<'_>) -> i32 {
        self(frame)
    }
}
