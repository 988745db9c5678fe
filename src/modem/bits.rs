//! MSB-first bit packing

/// Appends fixed-width fields to a byte vector, most significant bit first
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Append the low `width` bits of `value`
    pub fn push(&mut self, value: u32, width: usize) {
        debug_assert!(width <= 32);
        for i in (0..width).rev() {
            let bit = (value >> i) & 1;
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            if bit == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
    }

    /// Bytes written so far, the last one zero-padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads fixed-width fields from a byte slice; reads past the end yield zeros
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn read(&mut self, width: usize) -> u32 {
        debug_assert!(width <= 32);
        let mut value = 0u32;
        for _ in 0..width {
            let byte = self.bytes.get(self.position / 8).copied().unwrap_or(0);
            let bit = (byte >> (7 - self.position % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.position += 1;
        }
        value
    }
}

/// Split bytes into `bits`-wide symbols, zero-padding the final symbol
pub fn bytes_to_symbols(bytes: &[u8], bits: usize) -> Vec<u8> {
    assert!((1..=8).contains(&bits), "symbol width {bits} out of range");
    let count = (8 * bytes.len()).div_ceil(bits);
    let mut reader = BitReader::new(bytes);
    (0..count).map(|_| reader.read(bits) as u8).collect()
}

/// Reassemble `byte_len` bytes from `bits`-wide symbols
pub fn symbols_to_bytes(symbols: &[u8], bits: usize, byte_len: usize) -> Vec<u8> {
    assert!((1..=8).contains(&bits), "symbol width {bits} out of range");
    let mut writer = BitWriter::with_capacity(byte_len + 1);
    for &s in symbols {
        writer.push(s as u32, bits);
    }
    let mut bytes = writer.into_bytes();
    bytes.resize(byte_len, 0);
    bytes
}
