//! Supported Modbus function codes
//!
//! | Code | Function | Request body | Reply |
//! |------|----------|--------------|-------|
//! | 0x01 | Read Coils | address, count | bit-packed data |
//! | 0x02 | Read Discrete Inputs | address, count | bit-packed data |
//! | 0x03 | Read Holding Registers | address, count | big-endian words |
//! | 0x04 | Read Input Registers | address, count | big-endian words |
//! | 0x05 | Write Single Coil | address, 0xFF00/0x0000 | echo |
//! | 0x06 | Write Single Register | address, value | echo |
//! | 0x0F | Write Multiple Coils | address, count, bytes | echo of address, count |
//! | 0x10 | Write Multiple Registers | address, count, words | echo of address, count |

use std::fmt;

use crate::constants::*;
use crate::error::ModbusError;

/// Function code of a configured transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
}

impl FunctionCode {
    /// Parse a raw function code. Exception-flagged codes are not accepted.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            FC_READ_COILS => Some(Self::ReadCoils),
            FC_READ_DISCRETE_INPUTS => Some(Self::ReadDiscreteInputs),
            FC_READ_HOLDING_REGISTERS => Some(Self::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Some(Self::ReadInputRegisters),
            FC_WRITE_SINGLE_COIL => Some(Self::WriteSingleCoil),
            FC_WRITE_SINGLE_REGISTER => Some(Self::WriteSingleRegister),
            FC_WRITE_MULTIPLE_COILS => Some(Self::WriteMultipleCoils),
            FC_WRITE_MULTIPLE_REGISTERS => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Raw function code as transmitted
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ReadCoils => FC_READ_COILS,
            Self::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
            Self::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            Self::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleCoils => FC_WRITE_MULTIPLE_COILS,
            Self::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }

    /// FC01/FC02: bit-packed reads
    pub fn is_read_bits(self) -> bool {
        matches!(self, Self::ReadCoils | Self::ReadDiscreteInputs)
    }

    /// FC03/FC04: register reads
    pub fn is_read_registers(self) -> bool {
        matches!(self, Self::ReadHoldingRegisters | Self::ReadInputRegisters)
    }

    /// FC05/FC06: the request carries a literal value, not a count
    pub fn is_single_write(self) -> bool {
        matches!(self, Self::WriteSingleCoil | Self::WriteSingleRegister)
    }

    /// FC15/FC16: the request carries a byte count and payload
    pub fn is_multi_write(self) -> bool {
        matches!(self, Self::WriteMultipleCoils | Self::WriteMultipleRegisters)
    }

    /// Any write: the reply is an echo of the request header
    pub fn is_write(self) -> bool {
        self.is_single_write() || self.is_multi_write()
    }
}

impl TryFrom<u8> for FunctionCode {
    type Error = ModbusError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(ModbusError::invalid_function(code))
    }
}

impl From<FunctionCode> for u8 {
    fn from(function: FunctionCode) -> Self {
        function.to_u8()
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.to_u8())
    }
}
