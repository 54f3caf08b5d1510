//! Modbus CRC16
//!
//! Reflected CRC-16 with polynomial 0xA001 and initial value 0xFFFF. The
//! value returned by [`crc16`] has its bytes swapped, so writing it
//! big-endian puts the CRC low byte on the wire first, as RTU requires.

use crc::{Crc, CRC_16_MODBUS};

use crate::constants::CRC_LEN;
use crate::error::FrameError;

const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the byte-swapped Modbus CRC16 of `bytes`.
///
/// # Example
///
/// ```rust
/// use modbus_rtu_master::crc16;
///
/// // Read Holding Registers, slave 1, address 0x082B, 2 registers
/// let crc = crc16(&[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02]);
/// assert_eq!(crc, 0xB663);
/// ```
#[inline]
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC_MODBUS.checksum(bytes).swap_bytes()
}

/// CRC trailer in transmission order (low byte first).
#[inline]
pub fn crc_bytes(bytes: &[u8]) -> [u8; CRC_LEN] {
    crc16(bytes).to_be_bytes()
}

/// Verify the trailing two CRC bytes of a complete frame.
pub fn verify_crc(frame: &[u8]) -> Result<(), FrameError> {
    if frame.len() < CRC_LEN {
        return Err(FrameError::TooShort { len: frame.len() });
    }
    let (body, trailer) = frame.split_at(frame.len() - CRC_LEN);
    let expected = crc16(body);
    let actual = u16::from_be_bytes([trailer[0], trailer[1]]);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
