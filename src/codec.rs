//! # RTU Frame Codec
//!
//! Builds request frames from a [`Transaction`] and the shared
//! [`RegisterBank`], and validates and decodes slave replies back into the
//! bank.
//!
//! ## Request layout
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0 | unit id |
//! | 1 | function code |
//! | 2–3 | address (big-endian) |
//! | 4–5 | quantity or value (big-endian) |
//! | 6 | byte count (FC15/16 only) |
//! | 7.. | payload (FC15/16 only) |
//! | last 2 | CRC, low byte first |
//!
//! ## Reply validation order
//!
//! 1. at least [`MIN_RESPONSE_LEN`] bytes
//! 2. unit id matches the request
//! 3. exception flag (reported before the CRC is checked)
//! 4. CRC
//! 5. function-specific payload checks

use tracing::{debug, warn};

use crate::checksum::verify_crc;
use crate::constants::{CRC_LEN, EXCEPTION_FLAG, MIN_RESPONSE_LEN, REQUEST_HEADER_LEN};
use crate::error::{ExceptionCode, FrameError, ModbusError, ModbusResult};
use crate::frame::{hex, Frame};
use crate::function::FunctionCode;
use crate::register::RegisterBank;
use crate::transaction::Transaction;

/// Successfully decoded reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Read reply stored into `count` bank slots starting at `offset`
    Registers { offset: u16, count: u16 },
    /// Write confirmed by an exact echo
    Echo { address: u16, value: u16 },
}

/// Result of one request/reply cycle
pub type Outcome = Result<Reply, ModbusError>;

// ============================================================================
// Encoding
// ============================================================================

/// Encode the request frame of `tx`.
///
/// For FC06 the value sent is read live from the bank at `local_offset` and
/// stored into `tx.quantity_or_value`, so the echo check compares against
/// what actually went on the wire. FC15/16 take their payload from the
/// bank window; all other functions produce the fixed 8-byte frame.
///
/// # Example
///
/// ```rust
/// use modbus_rtu_master::{encode_request, FunctionCode, RegisterBank, Transaction};
///
/// let bank = RegisterBank::new(4);
/// let mut tx = Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0x082B, 2, 0);
/// let frame = encode_request(&mut tx, &bank).unwrap();
/// assert_eq!(frame.as_slice(), &[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02, 0xB6, 0x63]);
/// ```
pub fn encode_request(tx: &mut Transaction, bank: &RegisterBank) -> ModbusResult<Frame> {
    if tx.function == FunctionCode::WriteSingleRegister {
        tx.quantity_or_value = bank_window(bank, tx, 1)?[0];
    }

    let mut frame = Frame::new();
    frame.push(tx.unit_id)?;
    frame.push(tx.function.to_u8())?;
    frame.push_u16(tx.address)?;
    frame.push_u16(tx.quantity_or_value)?;

    match tx.function {
        FunctionCode::WriteMultipleCoils => {
            let coils = bank_window(bank, tx, usize::from(tx.quantity_or_value))?;
            let byte_count = coil_byte_count(tx.quantity_or_value);
            frame.push(u8::try_from(byte_count).map_err(|_| FrameError::BufferOverflow)?)?;
            for byte in pack_coils(coils) {
                frame.push(byte)?;
            }
        }
        FunctionCode::WriteMultipleRegisters => {
            let registers = bank_window(bank, tx, usize::from(tx.quantity_or_value))?;
            let byte_count = registers.len() * 2;
            frame.push(u8::try_from(byte_count).map_err(|_| FrameError::BufferOverflow)?)?;
            for &value in registers {
                frame.push_u16(value)?;
            }
        }
        FunctionCode::ReadCoils
        | FunctionCode::ReadDiscreteInputs
        | FunctionCode::ReadHoldingRegisters
        | FunctionCode::ReadInputRegisters
        | FunctionCode::WriteSingleCoil
        | FunctionCode::WriteSingleRegister => {}
    }

    frame.append_crc()?;
    Ok(frame)
}

/// Pack coil values LSB-first, eight per byte. Any non-zero value is ON;
/// unused high bits of the last byte are zero.
pub fn pack_coils(values: &[u16]) -> impl Iterator<Item = u8> + '_ {
    values.chunks(8).map(|chunk| {
        chunk
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .fold(0u8, |byte, (bit, _)| byte | (1 << bit))
    })
}

/// Unpack `out.len()` LSB-first bits from `bytes`, one 0/1 word per bit.
pub fn unpack_coils(bytes: &[u8], out: &mut [u16]) {
    for (index, slot) in out.iter_mut().enumerate() {
        let bit = bytes
            .get(index / 8)
            .map_or(0, |byte| (byte >> (index % 8)) & 0x01);
        *slot = u16::from(bit);
    }
}

/// Bytes needed for `count` bit-packed points
#[inline]
pub fn coil_byte_count(count: u16) -> usize {
    usize::from(count).div_ceil(8)
}

// ============================================================================
// Decoding
// ============================================================================

/// Validate and decode a reply to `tx`, storing read data into `bank`.
///
/// Nothing is written to the bank unless the whole reply is valid.
pub fn decode_response(frame: &[u8], tx: &Transaction, bank: &mut RegisterBank) -> Outcome {
    debug!("[MODBUS-RTU] RX slave:{} {}", tx.unit_id, hex(frame));

    if frame.len() < MIN_RESPONSE_LEN {
        return Err(FrameError::TooShort { len: frame.len() }.into());
    }

    if frame[0] != tx.unit_id {
        return Err(FrameError::IdMismatch {
            expected: tx.unit_id,
            actual: frame[0],
        }
        .into());
    }

    if frame[1] & EXCEPTION_FLAG != 0 {
        let code = ExceptionCode::from(frame[2]);
        warn!(
            unit_id = tx.unit_id,
            function = %tx.function,
            "exception response: {}",
            code
        );
        return Err(ModbusError::exception(frame[1] & !EXCEPTION_FLAG, code));
    }

    verify_crc(frame)?;
    let body = &frame[..frame.len() - CRC_LEN];

    let function =
        FunctionCode::from_u8(body[1]).ok_or(FrameError::UnsupportedFunction { code: body[1] })?;
    if function != tx.function {
        return Err(FrameError::FunctionMismatch {
            expected: tx.function.to_u8(),
            actual: body[1],
        }
        .into());
    }

    match function {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let count = tx.quantity_or_value;
            let data = read_payload(body, coil_byte_count(count))?;
            let window = bank_window_mut(bank, tx, usize::from(count))?;
            unpack_coils(data, window);
            Ok(Reply::Registers {
                offset: tx.local_offset,
                count,
            })
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let count = tx.quantity_or_value;
            let data = read_payload(body, usize::from(count) * 2)?;
            let window = bank_window_mut(bank, tx, usize::from(count))?;
            for (slot, word) in window.iter_mut().zip(data.chunks_exact(2)) {
                *slot = u16::from_be_bytes([word[0], word[1]]);
            }
            Ok(Reply::Registers {
                offset: tx.local_offset,
                count,
            })
        }
        FunctionCode::WriteSingleCoil
        | FunctionCode::WriteSingleRegister
        | FunctionCode::WriteMultipleCoils
        | FunctionCode::WriteMultipleRegisters => {
            // address and value, as in bytes 2..6 of the request
            let echo = exact_payload(body, 2, REQUEST_HEADER_LEN - 2)?;
            let echoed_address = u16::from_be_bytes([echo[0], echo[1]]);
            let echoed_value = u16::from_be_bytes([echo[2], echo[3]]);
            if echoed_address != tx.address || echoed_value != tx.quantity_or_value {
                return Err(FrameError::EchoMismatch {
                    sent_address: tx.address,
                    sent_value: tx.quantity_or_value,
                    echoed_address,
                    echoed_value,
                }
                .into());
            }
            Ok(Reply::Echo {
                address: echoed_address,
                value: echoed_value,
            })
        }
    }
}

/// Byte-count-prefixed payload of a read reply: `[id][fc][count][data..]`
fn read_payload(body: &[u8], expected: usize) -> Result<&[u8], FrameError> {
    let declared = usize::from(body[2]);
    if declared != expected {
        return Err(FrameError::ByteCountMismatch {
            expected,
            actual: declared,
        });
    }
    exact_payload(body, 3, expected)
}

/// `body[start..]`, which must be exactly `len` bytes long
fn exact_payload(body: &[u8], start: usize, len: usize) -> Result<&[u8], FrameError> {
    let payload = body.get(start..).unwrap_or_default();
    if payload.len() < len {
        return Err(FrameError::TooShort {
            len: body.len() + CRC_LEN,
        });
    }
    if payload.len() > len {
        return Err(FrameError::ByteCountMismatch {
            expected: len,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

fn bank_window<'a>(
    bank: &'a RegisterBank,
    tx: &Transaction,
    count: usize,
) -> ModbusResult<&'a [u16]> {
    bank.window(usize::from(tx.local_offset), count)
        .ok_or_else(|| window_error(tx, count, bank.len()))
}

fn bank_window_mut<'a>(
    bank: &'a mut RegisterBank,
    tx: &Transaction,
    count: usize,
) -> ModbusResult<&'a mut [u16]> {
    let len = bank.len();
    bank.window_mut(usize::from(tx.local_offset), count)
        .ok_or_else(|| window_error(tx, count, len))
}

// Only reachable when the table was not validated against this bank.
fn window_error(tx: &Transaction, count: usize, bank_len: usize) -> ModbusError {
    ModbusError::configuration(format!(
        "window {}+{} exceeds register bank of {}",
        tx.local_offset, count, bank_len
    ))
}
