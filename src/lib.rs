//! Single-carrier frame synchronizer
//!
//! Detects framed bursts in a baseband sample stream, recovers carrier,
//! gain and symbol timing from the preamble, decodes a self-describing
//! header and then the payload it announces, handing each frame to a
//! caller-supplied [`FrameHandler`](ports::FrameHandler).
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Configuration, statistics and error types, no I/O
//! - `dsp/` - Sample-at-a-time signal processing blocks
//! - `modem/` - Packet coding, frame generator and synchronizer
//! - `ports/` - Trait definitions for frame delivery and tracing
//! - `adapters/` - Implementations of ports (log tracing, channel delivery)

// Core (pure, no I/O)
pub mod domain;
pub mod dsp;
pub mod modem;
pub mod ports;

// Adapters
pub mod adapters;

pub use domain::{
    FrameDataStats, FrameStats, FrameSyncConfig, FrameSyncError, FrameSyncState,
    PayloadProperties, SyncResult,
};
pub use modem::{FrameGenerator, FrameSynchronizer};
pub use ports::{Frame, FrameHandler, SyncObserver};
