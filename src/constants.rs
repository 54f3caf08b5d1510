//! Modbus RTU protocol constants
//!
//! Frame sizes, function codes, exception codes and serial timing constants
//! used by the master. Function and exception codes follow the Modbus
//! Application Protocol v1.1b3; the timing constants follow the Modbus over
//! Serial Line guide (fixed 1.5T above 19200 baud).

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Capacity of the frame buffer shared by the outgoing request and the most
/// recently received reply.
///
/// This mirrors the receive FIFO of small serial peripherals. Frames longer
/// than this are reported as [`FrameError::BufferOverflow`](crate::FrameError::BufferOverflow).
pub const FRAME_BUFFER_SIZE: usize = 64;

/// Minimum length of a valid reply.
///
/// An exception response is the shortest legal reply:
/// Unit ID(1) + Function(1) + Exception code(1) + CRC(2) = 5 bytes
pub const MIN_RESPONSE_LEN: usize = 5;

/// Maximum RTU ADU size per the serial line specification:
/// Unit ID(1) + PDU(253) + CRC(2) = 256 bytes
///
/// Used as the upper bound on bytes drained from the line in one receive.
pub const MAX_ADU_SIZE: usize = 256;

/// Length of the fixed request header: Unit ID(1) + Function(1) + Address(2) + Quantity/Value(2)
pub const REQUEST_HEADER_LEN: usize = 6;

/// Length of the CRC trailer.
pub const CRC_LEN: usize = 2;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Coils (FC15)
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set in the function byte of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

// ============================================================================
// Single Coil Values
// ============================================================================

/// FC05 value forcing a coil ON
pub const COIL_ON: u16 = 0xFF00;

/// FC05 value forcing a coil OFF
pub const COIL_OFF: u16 = 0x0000;

// ============================================================================
// Serial Timing Constants
// ============================================================================

/// Above this baud rate the inter-character timeout is fixed.
pub const FIXED_TIMING_BAUD_THRESHOLD: u32 = 19_200;

/// Fixed 1.5 character time (microseconds) used above 19200 baud.
pub const FIXED_T1_5_US: u32 = 750;

/// 1.5 character times of a 10-bit character, in microsecond-baud units:
/// 1_000_000 us * 1.5 * 10 bits = 15_000_000
///
/// Dividing by the baud rate gives T1.5 in microseconds.
pub const T1_5_BAUD_US: u32 = 15_000_000;

/// Post-send settle delay expressed in multiples of T1.5.
pub const FRAME_DELAY_FACTOR: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MIN_RESPONSE_LEN, 5);
        assert_eq!(REQUEST_HEADER_LEN + CRC_LEN, 8);
        assert!(FRAME_BUFFER_SIZE < MAX_ADU_SIZE);
    }

    #[test]
    fn test_t1_5_at_9600_baud() {
        // 9600 baud, 10 bits per character: 1.5T = 1562 us
        assert_eq!(T1_5_BAUD_US / 9600, 1562);
    }
}
