//! Error detection keys
//!
//! The key is appended big-endian after the message bytes.

use crc::{Crc, CRC_16_IBM_SDLC, CRC_24_OPENPGP, CRC_32_ISO_HDLC, CRC_8_SMBUS};

use crate::domain::CrcScheme;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);
const CRC24: Crc<u32> = Crc::<u32>::new(&CRC_24_OPENPGP);
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

impl CrcScheme {
    /// Bytes appended by this scheme
    pub fn key_len(self) -> usize {
        match self {
            CrcScheme::None => 0,
            CrcScheme::Checksum | CrcScheme::Crc8 => 1,
            CrcScheme::Crc16 => 2,
            CrcScheme::Crc24 => 3,
            CrcScheme::Crc32 => 4,
        }
    }

    /// Compute the key for `data`, right-aligned in a u32
    pub fn generate_key(self, data: &[u8]) -> u32 {
        match self {
            CrcScheme::None => 0,
            CrcScheme::Checksum => {
                let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
                (!sum).wrapping_add(1) as u32
            }
            CrcScheme::Crc8 => CRC8.checksum(data) as u32,
            CrcScheme::Crc16 => CRC16.checksum(data) as u32,
            CrcScheme::Crc24 => CRC24.checksum(data),
            CrcScheme::Crc32 => CRC32.checksum(data),
        }
    }

    /// Append the key for `data` to `out`
    pub fn append_key(self, data: &[u8], out: &mut Vec<u8>) {
        let key = self.generate_key(data).to_be_bytes();
        out.extend_from_slice(&key[4 - self.key_len()..]);
    }

    /// Check a message followed by its key. Always true for `None`.
    pub fn validate(self, message_with_key: &[u8]) -> bool {
        let n = self.key_len();
        if message_with_key.len() < n {
            return false;
        }
        let (data, key) = message_with_key.split_at(message_with_key.len() - n);
        let received = key.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
        received == self.generate_key(data)
    }
}
