//! Core error types and result handling
//!
//! Every failure the master can observe on the wire is a value, never a
//! panic. Failures of a single transaction are recorded against that
//! transaction (retry and failure counters) and handed back to the caller
//! as a [`ModbusError`] inside the completed outcome; they never abort the
//! engine.

use std::io;

use thiserror::Error;

use crate::constants::{
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE, EXCEPTION_ILLEGAL_FUNCTION,
};

/// Result type used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Reasons a received (or to-be-sent) frame is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer bytes than the reply needs
    #[error("frame too short: {len} bytes")]
    TooShort { len: usize },

    /// Reply came from a different unit than the one addressed
    #[error("unit id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: u8, actual: u8 },

    /// Trailing CRC does not match the computed one
    #[error("CRC mismatch: expected {expected:#06X}, got {actual:#06X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Byte count field of a read reply disagrees with the requested point count
    #[error("byte count mismatch: expected {expected}, got {actual}")]
    ByteCountMismatch { expected: usize, actual: usize },

    /// Echo of a write request differs from what was sent
    #[error(
        "echo mismatch: sent {sent_address:#06X}/{sent_value:#06X}, \
         echoed {echoed_address:#06X}/{echoed_value:#06X}"
    )]
    EchoMismatch {
        sent_address: u16,
        sent_value: u16,
        echoed_address: u16,
        echoed_value: u16,
    },

    /// Reply function code differs from the request's
    #[error("function mismatch: expected {expected:#04X}, got {actual:#04X}")]
    FunctionMismatch { expected: u8, actual: u8 },

    /// Frame does not fit the fixed-capacity buffer
    #[error("frame buffer overflow")]
    BufferOverflow,

    /// Reply carries a function code the master does not implement
    #[error("unsupported function code {code:#04X}")]
    UnsupportedFunction { code: u8 },
}

/// Exception code carried by a slave's exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExceptionCode {
    /// The function code is not supported by the slave
    #[error("illegal function")]
    IllegalFunction,
    /// The data address is not allowed by the slave
    #[error("illegal data address")]
    IllegalDataAddress,
    /// A value in the request is not allowed by the slave
    #[error("illegal data value")]
    IllegalDataValue,
    /// Any other exception code
    #[error("miscellaneous exception {0:#04X}")]
    Misc(u8),
}

impl ExceptionCode {
    /// Raw exception code as transmitted
    pub fn code(self) -> u8 {
        match self {
            Self::IllegalFunction => EXCEPTION_ILLEGAL_FUNCTION,
            Self::IllegalDataAddress => EXCEPTION_ILLEGAL_DATA_ADDRESS,
            Self::IllegalDataValue => EXCEPTION_ILLEGAL_DATA_VALUE,
            Self::Misc(code) => code,
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            EXCEPTION_ILLEGAL_FUNCTION => Self::IllegalFunction,
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Self::IllegalDataAddress,
            EXCEPTION_ILLEGAL_DATA_VALUE => Self::IllegalDataValue,
            other => Self::Misc(other),
        }
    }
}

/// Top-level error type of the master.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModbusError {
    /// Malformed or mismatched frame
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Slave answered with an exception response
    #[error("exception response to function {function:#04X}: {code}")]
    Exception { function: u8, code: ExceptionCode },

    /// No reply within the configured response timeout
    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Serial transport failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Invalid master or transaction configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Function code outside the supported set
    #[error("invalid function code: {code:#04X}")]
    InvalidFunction { code: u8 },

    /// A request is still in flight
    #[error("a request is already awaiting a reply")]
    Busy,
}

impl ModbusError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create an exception error
    pub fn exception(function: u8, code: ExceptionCode) -> Self {
        Self::Exception { function, code }
    }

    /// Create an invalid function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Whether the slave answered with an exception response
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// Whether the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the reply was rejected as malformed
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}

impl From<io::Error> for ModbusError {
    fn from(err: io::Error) -> Self {
        Self::transport(err.to_string())
    }
}
