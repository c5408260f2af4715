//! Telegram checksum validation.
//!
//! DSMR 4.0 defines a CRC checksum at the end of the message, calculated
//! from and including the message start character `/` up to and including
//! the message end character `!`. Per the specification this is a 16-bit
//! CRC using the polynomial x^16 + x^15 + x^2 + 1 with reflected
//! input/output and seed 0 (CRC-16/ARC).

use crate::constants::CRC16_ARC_REFL;

/// Calculate the reflected CRC-16/ARC over a byte span.
pub fn crc16_arc(data: &[u8]) -> u16 {
    let mut crc = 0u16;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_ARC_REFL;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CRC-16/ARC check value from the standard test string.
    #[test]
    fn test_arc_check_value() {
        assert_eq!(crc16_arc(b"123456789"), 0xBB3D);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16_arc(&[]), 0);
    }
}
