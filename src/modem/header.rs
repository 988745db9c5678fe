//! Frame header
//!
//! Caller bytes followed by six protocol bytes describing the payload:
//!
//! | byte | field                              |
//! |------|------------------------------------|
//! | 0    | protocol version                   |
//! | 1-2  | payload length, big-endian         |
//! | 3    | modulation id                      |
//! | 4    | `crc << 5 \| fec_inner`            |
//! | 5    | `fec_outer`                        |
//!
//! The header itself is always CRC-32, Golay(24,12), BPSK.

use thiserror::Error;

use crate::domain::{
    CrcScheme, FecScheme, ModulationScheme, PayloadProperties, SyncResult, MAX_PAYLOAD_LEN,
};

use super::codec::PacketCodec;

pub const PROTOCOL_VERSION: u8 = 101;

/// Protocol bytes appended after the caller's header bytes
pub const PROTOCOL_LEN: usize = 6;

/// Why a received header was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderFault {
    #[error("header CRC failed")]
    Checksum,
    #[error("unsupported protocol version {0}")]
    Version(u8),
    #[error("unknown modulation id {0}")]
    Modulation(u8),
    #[error("unknown CRC id {0}")]
    Crc(u8),
    #[error("unknown FEC id {0}")]
    Fec(u8),
    #[error("payload length {0} out of range")]
    Length(usize),
}

/// Coding used for the header itself
pub fn header_properties(user_len: usize) -> PayloadProperties {
    PayloadProperties {
        payload_len: user_len + PROTOCOL_LEN,
        crc: CrcScheme::Crc32,
        fec_inner: FecScheme::Golay2412,
        fec_outer: FecScheme::None,
        modulation: ModulationScheme::Bpsk,
    }
}

pub fn header_codec(user_len: usize) -> SyncResult<PacketCodec> {
    PacketCodec::new(&header_properties(user_len))
}

/// Plain header bytes: `user` then the protocol fields for `payload`
pub fn encode_header(user: &[u8], payload: &PayloadProperties) -> Vec<u8> {
    debug_assert!(payload.payload_len <= MAX_PAYLOAD_LEN);
    let mut bytes = Vec::with_capacity(user.len() + PROTOCOL_LEN);
    bytes.extend_from_slice(user);
    bytes.push(PROTOCOL_VERSION);
    bytes.extend_from_slice(&(payload.payload_len as u16).to_be_bytes());
    bytes.push(payload.modulation.id());
    bytes.push((payload.crc.id() << 5) | (payload.fec_inner.id() & 0x1f));
    bytes.push(payload.fec_outer.id() & 0x1f);
    bytes
}

/// Parse the protocol fields trailing a decoded header
pub fn decode_header(bytes: &[u8]) -> Result<PayloadProperties, HeaderFault> {
    // Too short means nothing to parse; callers size headers from config
    let Some(proto) = bytes.len().checked_sub(PROTOCOL_LEN).map(|at| &bytes[at..]) else {
        return Err(HeaderFault::Checksum);
    };

    if proto[0] != PROTOCOL_VERSION {
        return Err(HeaderFault::Version(proto[0]));
    }
    let payload_len = u16::from_be_bytes([proto[1], proto[2]]) as usize;
    let modulation = ModulationScheme::from_id(proto[3]).ok_or(HeaderFault::Modulation(proto[3]))?;
    let crc_id = proto[4] >> 5;
    let crc = CrcScheme::from_id(crc_id).ok_or(HeaderFault::Crc(crc_id))?;
    let inner_id = proto[4] & 0x1f;
    let fec_inner = FecScheme::from_id(inner_id).ok_or(HeaderFault::Fec(inner_id))?;
    let outer_id = proto[5] & 0x1f;
    let fec_outer = FecScheme::from_id(outer_id).ok_or(HeaderFault::Fec(outer_id))?;

    Ok(PayloadProperties {
        payload_len,
        crc,
        fec_inner,
        fec_outer,
        modulation,
    })
}
