//! Transactions and the transaction table
//!
//! A [`Transaction`] is one request the master issues repeatedly: target
//! unit, function, remote address, a quantity-or-value operand, and the
//! offset of its window in the [`RegisterBank`](crate::RegisterBank). Each
//! transaction carries its own enable flag and running counters.
//!
//! ## The operand field
//!
//! `quantity_or_value` is a single field whose meaning depends on the
//! function code, exactly as it appears in bytes 4–5 of the request:
//!
//! | Function | `quantity_or_value` |
//! |----------|---------------------|
//! | FC01/02 | number of bits to read |
//! | FC03/04 | number of registers to read |
//! | FC05 | literal coil value, `0xFF00` (ON) or `0x0000` (OFF) |
//! | FC06 | literal register value; refreshed from the bank on every send |
//! | FC15 | number of coils to write |
//! | FC16 | number of registers to write |
//!
//! [`Transaction::operand`] gives the typed view of this field.

use std::ops::{Index, IndexMut};

use tracing::warn;

use crate::constants::{COIL_OFF, COIL_ON};
use crate::error::{ModbusError, ModbusResult};
use crate::function::FunctionCode;
use crate::register::RegisterBank;

/// Typed view of [`Transaction::quantity_or_value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Number of points (reads and multi-point writes)
    Count(u16),
    /// Literal value written by a single-point write
    Value(u16),
}

/// One configured request and its running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Target slave address (0-247, 0 is broadcast)
    pub unit_id: u8,
    /// Function code
    pub function: FunctionCode,
    /// Starting reference in the slave's address space
    pub address: u16,
    /// Point count or literal value, see the module docs
    pub quantity_or_value: u16,
    /// Index of this transaction's window in the register bank
    pub local_offset: u16,
    /// Disabled transactions are skipped until re-enabled by the application
    pub enabled: bool,

    /// Requests sent
    pub requests_sent: u32,
    /// Replies accepted
    pub successes: u32,
    /// Failed attempts of any kind
    pub failures: u32,
    /// Failed attempts that were exception responses
    pub exception_errors: u32,
    /// Consecutive failures since the last success or disable
    pub retries_in_flight: u8,
    /// Most recent failure
    pub last_error: Option<ModbusError>,
}

impl Transaction {
    /// Construct an enabled transaction with zeroed counters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use modbus_rtu_master::{FunctionCode, Operand, Transaction};
    ///
    /// // Read 4 holding registers from unit 1 at 0x0100 into bank[10..14]
    /// let tx = Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0x0100, 4, 10);
    /// assert!(tx.enabled);
    /// assert_eq!(tx.operand(), Operand::Count(4));
    /// ```
    pub fn new(
        unit_id: u8,
        function: FunctionCode,
        address: u16,
        quantity_or_value: u16,
        local_offset: u16,
    ) -> Self {
        Self {
            unit_id,
            function,
            address,
            quantity_or_value,
            local_offset,
            enabled: true,
            requests_sent: 0,
            successes: 0,
            failures: 0,
            exception_errors: 0,
            retries_in_flight: 0,
            last_error: None,
        }
    }

    /// FC05 transaction forcing a single coil ON or OFF
    pub fn write_coil(unit_id: u8, address: u16, on: bool) -> Self {
        let value = if on { COIL_ON } else { COIL_OFF };
        Self::new(unit_id, FunctionCode::WriteSingleCoil, address, value, 0)
    }

    /// Typed view of `quantity_or_value` for this function
    pub fn operand(&self) -> Operand {
        if self.function.is_single_write() {
            Operand::Value(self.quantity_or_value)
        } else {
            Operand::Count(self.quantity_or_value)
        }
    }

    /// Number of points addressed by the request
    pub fn point_count(&self) -> u16 {
        match self.operand() {
            Operand::Count(count) => count,
            Operand::Value(_) => 1,
        }
    }

    /// Number of register bank slots the transaction reads or writes.
    ///
    /// FC05 sends its literal value and touches no bank slot.
    pub fn bank_window_len(&self) -> usize {
        match self.function {
            FunctionCode::WriteSingleCoil => 0,
            FunctionCode::WriteSingleRegister => 1,
            _ => usize::from(self.quantity_or_value),
        }
    }

    pub(crate) fn record_request(&mut self) {
        self.requests_sent = self.requests_sent.wrapping_add(1);
    }

    pub(crate) fn record_success(&mut self) {
        self.successes = self.successes.wrapping_add(1);
        self.retries_in_flight = 0;
    }

    /// Count a failed attempt. Returns `true` if the retry limit was reached
    /// and the transaction has been disabled.
    pub(crate) fn record_failure(&mut self, error: &ModbusError, retry_limit: u8) -> bool {
        self.failures = self.failures.wrapping_add(1);
        if error.is_exception() {
            self.exception_errors = self.exception_errors.wrapping_add(1);
        }
        self.retries_in_flight = self.retries_in_flight.saturating_add(1);
        self.last_error = Some(error.clone());

        if self.retries_in_flight >= retry_limit {
            warn!(
                unit_id = self.unit_id,
                function = %self.function,
                address = self.address,
                "max retries reached, transaction disabled"
            );
            self.enabled = false;
            self.retries_in_flight = 0;
            return true;
        }
        false
    }

    /// Zero all counters, keeping configuration and enable flag
    pub fn reset_counters(&mut self) {
        self.requests_sent = 0;
        self.successes = 0;
        self.failures = 0;
        self.exception_errors = 0;
        self.retries_in_flight = 0;
        self.last_error = None;
    }
}

/// Ordered collection of transactions served round-robin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionTable {
    transactions: Vec<Transaction>,
}

impl TransactionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction, returning its index
    pub fn push(&mut self, transaction: Transaction) -> usize {
        self.transactions.push(transaction);
        self.transactions.len() - 1
    }

    /// Number of transactions
    #[inline]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Borrow a transaction
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    /// Mutably borrow a transaction
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Transaction> {
        self.transactions.get_mut(index)
    }

    /// Iterate in table order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Re-enable a transaction, clearing its retry counter.
    pub fn enable(&mut self, index: usize) -> ModbusResult<()> {
        let tx = self.slot(index)?;
        tx.enabled = true;
        tx.retries_in_flight = 0;
        Ok(())
    }

    /// Disable a transaction; takes effect on the next scheduling pass
    pub fn disable(&mut self, index: usize) -> ModbusResult<()> {
        self.slot(index)?.enabled = false;
        Ok(())
    }

    /// Number of enabled transactions
    pub fn enabled_count(&self) -> usize {
        self.transactions.iter().filter(|tx| tx.enabled).count()
    }

    /// First enabled transaction at or after `start`, wrapping at the end.
    pub fn next_enabled(&self, start: usize) -> Option<usize> {
        let len = self.transactions.len();
        if len == 0 {
            return None;
        }
        (0..len)
            .map(|step| (start + step) % len)
            .find(|&index| self.transactions[index].enabled)
    }

    /// Zero the counters of every transaction
    pub fn reset_counters(&mut self) {
        self.transactions
            .iter_mut()
            .for_each(Transaction::reset_counters);
    }

    /// Check every transaction's bank window against `bank`
    pub fn validate(&self, bank: &RegisterBank) -> ModbusResult<()> {
        for (index, tx) in self.transactions.iter().enumerate() {
            let offset = usize::from(tx.local_offset);
            if !bank.fits(offset, tx.bank_window_len()) {
                return Err(ModbusError::configuration(format!(
                    "transaction {} window {}..{} exceeds register bank of {}",
                    index,
                    offset,
                    offset + tx.bank_window_len(),
                    bank.len()
                )));
            }
        }
        Ok(())
    }

    fn slot(&mut self, index: usize) -> ModbusResult<&mut Transaction> {
        let len = self.transactions.len();
        self.transactions.get_mut(index).ok_or_else(|| {
            ModbusError::configuration(format!(
                "transaction index {} out of range (table has {})",
                index, len
            ))
        })
    }
}

impl From<Vec<Transaction>> for TransactionTable {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

impl FromIterator<Transaction> for TransactionTable {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self {
            transactions: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for TransactionTable {
    type Output = Transaction;

    fn index(&self, index: usize) -> &Self::Output {
        &self.transactions[index]
    }
}

impl IndexMut<usize> for TransactionTable {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.transactions[index]
    }
}
