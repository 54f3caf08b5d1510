//! Fixed-capacity RTU frame buffer
//!
//! A stack-allocated buffer reused for the outgoing request and the most
//! recently received reply. Writes past capacity fail with
//! [`FrameError::BufferOverflow`] instead of growing.

use heapless::Vec;
use tracing::debug;

use crate::checksum::crc_bytes;
use crate::constants::FRAME_BUFFER_SIZE;
use crate::error::FrameError;

/// RTU frame: `[unit_id][function][payload...][crc_lo][crc_hi]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8, FRAME_BUFFER_SIZE>,
}

impl Frame {
    /// Create an empty frame
    #[inline]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a frame from a byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut frame = Self::new();
        frame.extend(bytes)?;
        Ok(frame)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), FrameError> {
        self.data.push(byte).map_err(|_| FrameError::BufferOverflow)
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.extend(&value.to_be_bytes())
    }

    /// Extend with a byte slice; nothing is written if it does not fit
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.data
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::BufferOverflow)
    }

    /// Append the CRC of everything written so far, low byte first
    pub fn append_crc(&mut self) -> Result<(), FrameError> {
        let crc = crc_bytes(&self.data);
        self.extend(&crc)
    }

    /// Get immutable data slice
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get current length
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if no further byte fits
    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.is_full()
    }

    /// Clear frame
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Unit id (first byte)
    #[inline]
    pub fn unit_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Function byte (second byte), possibly exception-flagged
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.data.get(1).copied()
    }

    /// Log the frame as a hex dump
    pub(crate) fn trace(&self, direction: &str) {
        debug!("[MODBUS-RTU] {} {}", direction, hex(self.as_slice()));
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Format raw bytes as a space separated hex string
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<std::vec::Vec<_>>()
        .join(" ")
}
