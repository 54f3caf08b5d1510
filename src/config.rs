//! # Master Configuration
//!
//! Serial line and scheduling parameters of the master.
//!
//! ## Character timing
//!
//! Modbus states that above 19200 baud a fixed 750 us inter-character
//! timeout is used. Below that the timeout is 1.5 character times; with a
//! 10-bit character at 9600 baud one character takes 1.0417 ms, so
//! T1.5 = 1.5625 ms. In general `T1.5(us) = 15_000_000 / baud`.
//!
//! After a request is flushed the line is held for two T1.5 intervals
//! before direction control is released, so the last character leaves the
//! transceiver intact.

use std::time::Duration;

use crate::constants::{FIXED_T1_5_US, FIXED_TIMING_BAUD_THRESHOLD, FRAME_DELAY_FACTOR, T1_5_BAUD_US};
use crate::error::{ModbusError, ModbusResult};

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default response timeout in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default minimum interval between the end of one cycle and the next send, in milliseconds.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 200;

/// Default number of consecutive failures before a transaction is disabled.
pub const DEFAULT_RETRY_LIMIT: u8 = 10;

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial character format (data bits, parity, stop bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteFormat {
    /// Data bits per character (5-8)
    pub data_bits: u8,
    /// Parity bit
    pub parity: Parity,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
}

impl ByteFormat {
    /// 8 data bits, no parity, 1 stop bit
    pub const EIGHT_N_ONE: Self = Self {
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
    };

    /// 8 data bits, even parity, 1 stop bit (the Modbus default)
    pub const EIGHT_E_ONE: Self = Self {
        data_bits: 8,
        parity: Parity::Even,
        stop_bits: 1,
    };

    /// 8 data bits, no parity, 2 stop bits
    pub const EIGHT_N_TWO: Self = Self {
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 2,
    };

    fn validate(&self) -> ModbusResult<()> {
        if !(5..=8).contains(&self.data_bits) {
            return Err(ModbusError::configuration(format!(
                "invalid data bits: {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(ModbusError::configuration(format!(
                "invalid stop bits: {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl Default for ByteFormat {
    fn default() -> Self {
        Self::EIGHT_N_ONE
    }
}

/// How the master is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// `tick()` selects, sends, receives, times out and retries on its own
    #[default]
    Automatic,
    /// The caller drives `send_next()` / `receive_pending()`; no timeouts
    Manual,
}

/// Inter-character timing derived from the baud rate, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharTiming {
    /// 1.5 character times: wait after each received byte
    pub t1_5_us: u32,
    /// Post-send settle delay before releasing direction control
    pub frame_delay_us: u32,
}

impl CharTiming {
    /// Derive timing from the baud rate. A zero baud rate is treated as the
    /// slowest standard rate.
    pub fn from_baud(baud_rate: u32) -> Self {
        let t1_5_us = if baud_rate > FIXED_TIMING_BAUD_THRESHOLD {
            FIXED_T1_5_US
        } else {
            T1_5_BAUD_US / baud_rate.max(1)
        };
        Self {
            t1_5_us,
            frame_delay_us: t1_5_us.saturating_mul(FRAME_DELAY_FACTOR),
        }
    }
}

/// Master configuration.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use modbus_rtu_master::{ByteFormat, MasterConfig};
///
/// let config = MasterConfig::new()
///     .with_baud_rate(19200)
///     .with_byte_format(ByteFormat::EIGHT_E_ONE)
///     .with_response_timeout(Duration::from_millis(500))
///     .with_retry_limit(3);
///
/// assert_eq!(config.timing().t1_5_us, 781);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterConfig {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Serial character format
    pub byte_format: ByteFormat,
    /// Time to wait for a reply before counting a failure
    pub response_timeout: Duration,
    /// Minimum time between an outcome and the next send
    pub polling_interval: Duration,
    /// Consecutive failures before a transaction is disabled
    pub retry_limit: u8,
    /// Automatic or manual scheduling
    pub mode: ScheduleMode,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            byte_format: ByteFormat::default(),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            polling_interval: Duration::from_millis(DEFAULT_POLLING_INTERVAL_MS),
            retry_limit: DEFAULT_RETRY_LIMIT,
            mode: ScheduleMode::default(),
        }
    }
}

impl MasterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set character format.
    pub fn with_byte_format(mut self, byte_format: ByteFormat) -> Self {
        self.byte_format = byte_format;
        self
    }

    /// Set response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set polling interval.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Set retry limit.
    pub fn with_retry_limit(mut self, retry_limit: u8) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Set scheduling mode.
    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Character timing for the configured baud rate.
    pub fn timing(&self) -> CharTiming {
        CharTiming::from_baud(self.baud_rate)
    }

    /// Check the configuration for values the master cannot run with.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.baud_rate == 0 {
            return Err(ModbusError::configuration("baud rate must be non-zero"));
        }
        if self.retry_limit == 0 {
            return Err(ModbusError::configuration("retry limit must be at least 1"));
        }
        self.byte_format.validate()
    }
}
