//! # Modbus RTU Master
//!
//! A polling Modbus RTU master for half-duplex RS-485 lines. The
//! application describes a table of transactions and a flat register bank;
//! the master cycles through the table round-robin, writing replies into
//! the bank and tracking per-transaction retries and counters.
//!
//! ## Features
//!
//! - **Fixed memory**: one 64-byte stack frame buffer, no allocation per cycle
//! - **Non-blocking**: driven by a periodic `tick()`; the only waits are the
//!   bounded RTU character-time delays
//! - **Hardened decoder**: arbitrary line noise never panics or overruns a buffer
//! - **Pluggable I/O**: [`Transport`] and [`Clock`] traits; a serial
//!   implementation is available with the `rtu` feature
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Bank usage |
//! |------|----------|------------|
//! | 0x01 | Read Coils | one word (0/1) per coil |
//! | 0x02 | Read Discrete Inputs | one word (0/1) per input |
//! | 0x03 | Read Holding Registers | one word per register |
//! | 0x04 | Read Input Registers | one word per register |
//! | 0x05 | Write Single Coil | none, literal value |
//! | 0x06 | Write Single Register | one word |
//! | 0x0F | Write Multiple Coils | one word per coil |
//! | 0x10 | Write Multiple Registers | one word per register |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "rtu")]
//! # fn main() -> modbus_rtu_master::ModbusResult<()> {
//! use modbus_rtu_master::{
//!     FunctionCode, MasterConfig, ModbusMaster, RegisterBank, SerialTransport, SystemClock,
//!     Transaction, TransactionTable,
//! };
//!
//! let config = MasterConfig::new().with_baud_rate(19200);
//! let transport = SerialTransport::open("/dev/ttyUSB0", &config)?;
//! let mut master = ModbusMaster::new(transport, SystemClock::new(), config)?;
//!
//! let mut table = TransactionTable::new();
//! // unit 1, holding registers 0x082B..0x082D into bank[0..2]
//! table.push(Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0x082B, 2, 0));
//! // unit 1, force coil 0x00AC on
//! table.push(Transaction::write_coil(1, 0x00AC, true));
//! master.configure(table, RegisterBank::new(2))?;
//!
//! loop {
//!     if let Some(done) = master.tick()? {
//!         println!("transaction {}: {:?}", done.index, done.outcome);
//!     }
//! }
//! # }
//! # #[cfg(not(feature = "rtu"))]
//! # fn main() {}
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus RTU protocol constants
pub mod constants;

/// Modbus CRC16
pub mod checksum;

/// Function code enumeration
pub mod function;

/// Fixed-capacity RTU frame buffer
pub mod frame;

/// Request encoding and reply decoding
pub mod codec;

// ============================================================================
// Scheduling
// ============================================================================

/// Shared register storage
pub mod register;

/// Transaction descriptors and the transaction table
pub mod transaction;

/// Serial line and scheduling configuration
pub mod config;

/// Transport and clock adapters
pub mod transport;

/// Transaction scheduler
pub mod master;

/// Mutex-protected master handle
pub mod shared;

/// Serial port transport
#[cfg(feature = "rtu")]
pub mod serial;

#[cfg(test)]
mod mock;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Error handling ===
pub use error::{ExceptionCode, FrameError, ModbusError, ModbusResult};

// === Protocol ===
pub use checksum::{crc16, verify_crc};
pub use codec::{decode_response, encode_request, Outcome, Reply};
pub use frame::Frame;
pub use function::FunctionCode;

// === Scheduling ===
pub use config::{ByteFormat, CharTiming, MasterConfig, Parity, ScheduleMode};
pub use master::{Completion, MasterState, ModbusMaster};
pub use register::RegisterBank;
pub use shared::SharedMaster;
pub use transaction::{Operand, Transaction, TransactionTable};
pub use transport::{Clock, SystemClock, Transport};

#[cfg(feature = "rtu")]
pub use serial::SerialTransport;

// === Commonly needed constants ===
pub use constants::{COIL_OFF, COIL_ON, FRAME_BUFFER_SIZE};

#[doc(hidden)]
pub use config::{
    DEFAULT_BAUD_RATE, DEFAULT_POLLING_INTERVAL_MS, DEFAULT_RESPONSE_TIMEOUT_MS,
    DEFAULT_RETRY_LIMIT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Modbus RTU Master v{} - polling RS-485 master", VERSION)
}
