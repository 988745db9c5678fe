//! Core domain types
//!
//! Pure types with no I/O dependencies beyond configuration persistence.
//! These describe the link (configuration), what a synchronizer reports
//! (statistics) and what can go wrong while building one (errors).

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
