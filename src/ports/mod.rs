//! Port traits (interfaces)
//!
//! These traits define the boundaries between the synchronizer core and the
//! code around it. Adapters implement them to deliver frames elsewhere or to
//! trace the receiver.

pub mod frame_handler;
pub mod observer;

pub use frame_handler::*;
pub use observer::*;
