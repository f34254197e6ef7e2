//! # CRC-16/MCRF4XX Implementation
//!
//! Checksum calculation for MAVLink v1 frames.
//!
//! **Polynomial**: 0x8408 (reflected 0x1021)
//! **Initial Value**: 0xFFFF
//!
//! MAVLink extends the plain checksum with a per-message `CRC_EXTRA` byte
//! folded in after the frame bytes, so that a receiver with a different
//! message definition rejects the frame.

/// CRC-16/MCRF4XX seed value
const CRC_INIT: u16 = 0xFFFF;

/// Reflected CRC-16-CCITT polynomial (slow reference implementation only)
const CRC16_POLY: u16 = 0x8408;

/// Accumulate one byte into the running checksum
#[inline]
pub fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    let tmp = u16::from(byte ^ (crc as u8));
    let tmp = tmp ^ (tmp << 4);
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

/// Calculate the MAVLink frame checksum
///
/// # Arguments
///
/// * `data` - Frame bytes covered by the checksum (everything after the
///   start byte, up to but excluding the checksum itself)
/// * `crc_extra` - Per-message seed byte from the message definition
///
/// # Returns
///
/// * `u16` - Calculated checksum (transmitted little-endian)
pub fn crc16_mcrf4xx(data: &[u8], crc_extra: u8) -> u16 {
    let mut crc = CRC_INIT;

    for &byte in data {
        crc = crc_accumulate(byte, crc);
    }
    // Fold in CRC_EXTRA
    crc_accumulate(crc_extra, crc)
}

/// Calculate the checksum using the direct bitwise algorithm (slow, for verification)
///
/// This implementation is slower but easier to verify against the
/// specification. Used primarily for testing the shift-trick implementation.
#[allow(dead_code)]
fn crc16_mcrf4xx_slow(data: &[u8], crc_extra: u8) -> u16 {
    let mut crc = CRC_INIT;

    let mut step = |byte: u8, mut crc: u16| -> u16 {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
        crc
    };

    for &byte in data {
        crc = step(byte, crc);
    }
    step(crc_extra, crc)
}
