//! Framing modem
//!
//! Everything above the sample-level DSP: packet coding, the frame layout
//! and the generator/synchronizer pair that speaks it.

pub mod bits;
pub mod codec;
pub mod crc;
pub mod fec;
pub mod framegen;
pub mod framesync;
pub mod header;
pub mod modulation;
pub mod packetizer;
pub mod preamble;
pub mod scramble;

pub use codec::PacketCodec;
pub use framegen::FrameGenerator;
pub use framesync::FrameSynchronizer;
pub use header::HeaderFault;
pub use modulation::{Decision, Modem};
pub use packetizer::Packetizer;
pub use preamble::{Preamble, PREAMBLE_LEN};
