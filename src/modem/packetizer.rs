//! Byte-level packet protection
//!
//! encode: message, append CRC key, inner FEC, outer FEC.
//! decode runs the same chain backwards.

use crate::domain::{CrcScheme, FecScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packetizer {
    msg_len: usize,
    crc: CrcScheme,
    fec_inner: FecScheme,
    fec_outer: FecScheme,
}

impl Packetizer {
    pub fn new(msg_len: usize, crc: CrcScheme, fec_inner: FecScheme, fec_outer: FecScheme) -> Self {
        Self {
            msg_len,
            crc,
            fec_inner,
            fec_outer,
        }
    }

    pub fn msg_len(&self) -> usize {
        self.msg_len
    }

    pub fn crc(&self) -> CrcScheme {
        self.crc
    }

    pub fn fec_inner(&self) -> FecScheme {
        self.fec_inner
    }

    pub fn fec_outer(&self) -> FecScheme {
        self.fec_outer
    }

    /// Bytes after the inner code
    fn inner_len(&self) -> usize {
        self.fec_inner.encoded_len(self.msg_len + self.crc.key_len())
    }

    /// Encoded packet length in bytes
    pub fn packet_len(&self) -> usize {
        self.fec_outer.encoded_len(self.inner_len())
    }

    /// # Panics
    /// If `msg.len()` differs from the configured message length.
    pub fn encode(&self, msg: &[u8]) -> Vec<u8> {
        assert_eq!(
            msg.len(),
            self.msg_len,
            "packetizer configured for {} message bytes, got {}",
            self.msg_len,
            msg.len()
        );
        let mut keyed = Vec::with_capacity(self.msg_len + self.crc.key_len());
        keyed.extend_from_slice(msg);
        self.crc.append_key(msg, &mut keyed);
        self.fec_outer.encode(&self.fec_inner.encode(&keyed))
    }

    /// Best-effort message bytes and whether the CRC passed
    ///
    /// # Panics
    /// If `packet.len()` differs from [`Self::packet_len`].
    pub fn decode(&self, packet: &[u8]) -> (Vec<u8>, bool) {
        assert_eq!(
            packet.len(),
            self.packet_len(),
            "packetizer expects {} packet bytes, got {}",
            self.packet_len(),
            packet.len()
        );
        let inner = self.fec_outer.decode(packet, self.inner_len());
        let mut keyed = self
            .fec_inner
            .decode(&inner, self.msg_len + self.crc.key_len());
        let valid = self.crc.validate(&keyed);
        keyed.truncate(self.msg_len);
        (keyed, valid)
    }
}
