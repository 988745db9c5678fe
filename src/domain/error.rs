//! Domain error types

use thiserror::Error;

/// Errors reported when building synchronizer components
///
/// The streaming path never returns these. Everything that can go wrong while
/// samples are flowing is reported as a validity flag in the frame callback.
#[derive(Error, Debug)]
pub enum FrameSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for synchronizer construction and configuration
pub type SyncResult<T> = Result<T, FrameSyncError>;
