//! Data whitening
//!
//! XOR with a fixed repeating mask breaks up long runs of identical
//! symbols (an all-zero payload would otherwise be a pure tone). The mask
//! is its own inverse.

const MASK: [u8; 4] = [0xb4, 0x6a, 0x8b, 0xc5];

/// Scramble or unscramble `data` in place
pub fn scramble(data: &mut [u8]) {
    for (b, m) in data.iter_mut().zip(MASK.iter().cycle()) {
        *b ^= m;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_become_mask() {
        let mut data = [0u8; 6];
        scramble(&mut data);
        assert_eq!(data, [0xb4, 0x6a, 0x8b, 0xc5, 0xb4, 0x6a]);
    }

    #[test]
    fn test_applying_twice_restores() {
        let original: Vec<u8> = (0..=255).collect();
        let mut data = original.clone();
        scramble(&mut data);
        assert_ne!(data, original);
        scramble(&mut data);
        assert_eq!(data, original);
    }
}
