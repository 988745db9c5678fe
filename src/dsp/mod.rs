//! Digital Signal Processing
//!
//! Sample-at-a-time building blocks for the receive chain. No I/O
//! dependencies.

pub mod detector;
pub mod energy;
pub mod equalizer;
pub mod nco;
pub mod pfb;
pub mod raised_cosine;
pub mod sample;
pub mod symsync;
pub mod window;

// Re-export commonly used items
pub use detector::PreambleDetector;
pub use equalizer::{Equalizer, LmsEqualizer, RlsEqualizer};
pub use nco::Nco;
pub use pfb::Pfb;
pub use sample::Sample;
pub use symsync::SymbolSync;
pub use window::Window;
