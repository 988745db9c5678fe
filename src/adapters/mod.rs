//! Adapters (implementations of port traits)

pub mod channel_sink;
pub mod log_observer;

pub use channel_sink::{ChannelSink, FrameReport};
pub use log_observer::LogObserver;
