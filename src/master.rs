//! # Transaction Scheduler
//!
//! [`ModbusMaster`] owns the transaction table, the register bank and the
//! single frame buffer, and drives them through a request/reply cycle:
//!
//! ```text
//!            send                  reply / timeout
//!   Idle ───────────► AwaitingReply ───────────────► Turnaround
//!    ▲                                                   │
//!    └──────────────── polling interval elapsed ─────────┘
//! ```
//!
//! In [`ScheduleMode::Automatic`] every step happens inside [`tick`], which
//! the application calls periodically. Transactions are selected
//! round-robin, skipping disabled ones. In [`ScheduleMode::Manual`] the
//! caller sends with [`send_next`] and collects the reply with
//! [`receive_pending`]; there is no timeout and no polling throttle.
//!
//! Nothing here blocks except the two bounded micro-delays of the RTU
//! line: the post-send settle delay and the 1.5 character wait between
//! received bytes.
//!
//! [`tick`]: ModbusMaster::tick
//! [`send_next`]: ModbusMaster::send_next
//! [`receive_pending`]: ModbusMaster::receive_pending

use std::io;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::codec::{decode_response, encode_request, Outcome};
use crate::config::{CharTiming, MasterConfig, ScheduleMode};
use crate::constants::{MAX_ADU_SIZE, MIN_RESPONSE_LEN};
use crate::error::{FrameError, ModbusError, ModbusResult};
use crate::frame::Frame;
use crate::register::RegisterBank;
use crate::transaction::TransactionTable;
use crate::transport::{Clock, Transport};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    /// No request outstanding; free to send
    Idle,
    /// Request for `index` sent at `sent_at`, reply not yet received
    AwaitingReply { index: usize, sent_at: Duration },
    /// Cycle finished at `since`; waiting out the polling interval
    Turnaround { since: Duration },
}

/// A finished request/reply cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Index of the transaction in the table
    pub index: usize,
    /// What happened
    pub outcome: Outcome,
}

impl Completion {
    /// Whether the cycle succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Modbus RTU master.
///
/// # Example
///
/// ```rust,no_run
/// use modbus_rtu_master::{
///     FunctionCode, MasterConfig, ModbusMaster, RegisterBank, SystemClock, Transaction,
///     TransactionTable, Transport,
/// };
///
/// fn run<T: Transport>(transport: T) -> modbus_rtu_master::ModbusResult<()> {
///     let mut master = ModbusMaster::new(transport, SystemClock::new(), MasterConfig::default())?;
///
///     let mut table = TransactionTable::new();
///     table.push(Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0, 4, 0));
///     master.configure(table, RegisterBank::new(4))?;
///
///     loop {
///         if let Some(done) = master.tick()? {
///             println!("{}: {:?} -> {:?}", done.index, done.outcome, master.registers());
///         }
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ModbusMaster<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    config: MasterConfig,
    mode: ScheduleMode,
    timing: CharTiming,
    table: TransactionTable,
    bank: RegisterBank,
    buffer: Frame,
    state: MasterState,
    cursor: usize,
    last_completion: Option<Completion>,
    response_time: Option<Duration>,
    total_requests: u32,
    total_failed: u32,
}

impl<T: Transport, C: Clock> ModbusMaster<T, C> {
    /// Create a master with an empty transaction table.
    pub fn new(transport: T, clock: C, config: MasterConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            clock,
            config,
            mode: config.mode,
            timing: config.timing(),
            table: TransactionTable::new(),
            bank: RegisterBank::new(0),
            buffer: Frame::new(),
            state: MasterState::Idle,
            cursor: 0,
            last_completion: None,
            response_time: None,
            total_requests: 0,
            total_failed: 0,
        })
    }

    /// Load a transaction table and register bank, scheduled in the mode
    /// given by [`MasterConfig::mode`].
    ///
    /// Fails with a configuration error if any transaction's window does not
    /// fit the bank.
    pub fn configure(&mut self, table: TransactionTable, bank: RegisterBank) -> ModbusResult<()> {
        self.load(table, bank, self.config.mode)
    }

    /// Load a transaction table and register bank for manual scheduling,
    /// whatever the configured mode.
    pub fn configure_manual(
        &mut self,
        table: TransactionTable,
        bank: RegisterBank,
    ) -> ModbusResult<()> {
        self.load(table, bank, ScheduleMode::Manual)
    }

    fn load(
        &mut self,
        table: TransactionTable,
        bank: RegisterBank,
        mode: ScheduleMode,
    ) -> ModbusResult<()> {
        table.validate(&bank)?;
        info!(
            transactions = table.len(),
            registers = bank.len(),
            ?mode,
            "master configured"
        );
        self.table = table;
        self.bank = bank;
        self.mode = mode;
        self.buffer.clear();
        self.state = MasterState::Idle;
        self.cursor = 0;
        self.last_completion = None;
        self.response_time = None;
        self.total_requests = 0;
        self.total_failed = 0;
        Ok(())
    }

    // ========================================================================
    // Automatic mode
    // ========================================================================

    /// Advance the scheduler by one step.
    ///
    /// From `Idle` a step selects the next transaction, sends it and polls
    /// once for its reply. Returns the completed cycle, if this step
    /// finished one. Per-transaction failures are reported inside the
    /// [`Completion`]; `Err` is only returned when called in manual mode.
    pub fn tick(&mut self) -> ModbusResult<Option<Completion>> {
        self.require_mode(ScheduleMode::Automatic)?;

        if let MasterState::Turnaround { since } = self.state {
            if self.clock.elapsed_since(since) < self.config.polling_interval {
                return Ok(None);
            }
            self.state = MasterState::Idle;
        }

        if let MasterState::Idle = self.state {
            let Some(index) = self.table.next_enabled(self.cursor) else {
                return Ok(None);
            };
            if let Some(done) = self.start(index) {
                return Ok(Some(done));
            }
        }

        match self.state {
            MasterState::AwaitingReply { index, sent_at } => Ok(self.poll(index, sent_at, true)),
            MasterState::Idle | MasterState::Turnaround { .. } => Ok(None),
        }
    }

    // ========================================================================
    // Manual mode
    // ========================================================================

    /// Send the next enabled transaction.
    ///
    /// Returns the index sent, or `None` if every transaction is disabled.
    /// A send that fails locally or on the transport is recorded against the
    /// transaction and returned as `Err`.
    pub fn send_next(&mut self) -> ModbusResult<Option<usize>> {
        self.require_mode(ScheduleMode::Manual)?;
        if let MasterState::AwaitingReply { .. } = self.state {
            return Err(ModbusError::Busy);
        }

        let Some(index) = self.table.next_enabled(self.cursor) else {
            return Ok(None);
        };
        match self.start(index) {
            Some(Completion {
                outcome: Err(err), ..
            }) => Err(err),
            _ => Ok(Some(index)),
        }
    }

    /// Collect the reply to the request in flight, if it has arrived.
    pub fn receive_pending(&mut self) -> ModbusResult<Option<Completion>> {
        self.require_mode(ScheduleMode::Manual)?;
        match self.state {
            MasterState::AwaitingReply { index, sent_at } => Ok(self.poll(index, sent_at, false)),
            _ => Ok(None),
        }
    }

    /// Give up on the request in flight, counting it as timed out.
    pub fn fail_pending(&mut self) -> Option<Completion> {
        match self.state {
            MasterState::AwaitingReply { index, sent_at } => {
                let waited = self.clock.elapsed_since(sent_at);
                Some(self.complete(index, Err(ModbusError::timeout(millis(waited)))))
            }
            _ => None,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether a new request could be sent now
    pub fn is_ready(&self) -> bool {
        match self.state {
            MasterState::Idle => true,
            MasterState::AwaitingReply { .. } => false,
            MasterState::Turnaround { since } => {
                self.clock.elapsed_since(since) >= self.config.polling_interval
            }
        }
    }

    /// Scheduling mode in effect
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Current scheduler state
    pub fn state(&self) -> MasterState {
        self.state
    }

    /// Most recently finished cycle
    pub fn last_completion(&self) -> Option<&Completion> {
        self.last_completion.as_ref()
    }

    /// Whether the most recent cycle succeeded; `false` before the first one
    pub fn last_succeeded(&self) -> bool {
        self.last_completion
            .as_ref()
            .is_some_and(Completion::is_success)
    }

    /// Time from the end of the last send to the first byte of its reply
    pub fn response_time(&self) -> Option<Duration> {
        self.response_time
    }

    /// Requests put on the wire since the last `configure`
    pub fn total_requests(&self) -> u32 {
        self.total_requests
    }

    /// Failed cycles since the last `configure`
    pub fn total_failed(&self) -> u32 {
        self.total_failed
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub fn table(&self) -> &TransactionTable {
        &self.table
    }

    /// Mutable access to the table, e.g. to re-enable a transaction
    pub fn table_mut(&mut self) -> &mut TransactionTable {
        &mut self.table
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.bank
    }

    /// Mutable access to the bank, e.g. to stage values for a write.
    ///
    /// Do not change the window of a transaction that is awaiting its reply.
    pub fn registers_mut(&mut self) -> &mut RegisterBank {
        &mut self.bank
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Release the transport and clock
    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    // ========================================================================
    // Cycle internals
    // ========================================================================

    fn require_mode(&self, mode: ScheduleMode) -> ModbusResult<()> {
        if self.mode != mode {
            return Err(ModbusError::configuration(format!(
                "operation requires {:?} mode, master is in {:?} mode",
                mode, self.mode
            )));
        }
        Ok(())
    }

    /// Send transaction `index`. A failed send completes the cycle at once.
    fn start(&mut self, index: usize) -> Option<Completion> {
        self.cursor = index + 1;
        match self.transmit(index) {
            Ok(()) => {
                self.state = MasterState::AwaitingReply {
                    index,
                    sent_at: self.clock.now(),
                };
                None
            }
            Err(err) => Some(self.complete(index, Err(err))),
        }
    }

    fn transmit(&mut self, index: usize) -> ModbusResult<()> {
        self.discard_stale()?;

        let tx = self.table.get_mut(index).ok_or_else(|| {
            ModbusError::configuration(format!("transaction index {} out of range", index))
        })?;
        self.buffer = encode_request(tx, &self.bank)?;
        tx.record_request();
        self.total_requests = self.total_requests.wrapping_add(1);
        self.buffer.trace("TX");

        self.transport.set_transmit_enabled(true)?;
        let written = self
            .transport
            .write(self.buffer.as_slice())
            .and_then(|()| self.transport.flush());
        self.clock.sleep_micros(self.timing.frame_delay_us);
        self.transport.set_transmit_enabled(false)?;
        written?;
        Ok(())
    }

    /// Drop bytes left on the line by an earlier, abandoned reply
    fn discard_stale(&mut self) -> io::Result<()> {
        let mut discarded = 0;
        while discarded < MAX_ADU_SIZE && self.transport.bytes_available()? > 0 {
            self.transport.read_byte()?;
            discarded += 1;
        }
        if discarded > 0 {
            debug!("[MODBUS-RTU] discarded {} stale bytes", discarded);
        }
        Ok(())
    }

    fn poll(&mut self, index: usize, sent_at: Duration, check_timeout: bool) -> Option<Completion> {
        let available = match self.transport.bytes_available() {
            Ok(available) => available,
            Err(err) => return Some(self.complete(index, Err(err.into()))),
        };

        if available == 0 {
            let waited = self.clock.elapsed_since(sent_at);
            if check_timeout && waited > self.config.response_timeout {
                debug!(index, waited_ms = millis(waited), "[MODBUS-RTU] response timeout");
                let timeout_ms = millis(self.config.response_timeout);
                return Some(self.complete(index, Err(ModbusError::timeout(timeout_ms))));
            }
            return None;
        }

        self.response_time = Some(self.clock.elapsed_since(sent_at));
        let outcome = match (self.receive_frame(), self.table.get(index)) {
            (Ok(()), Some(tx)) => decode_response(self.buffer.as_slice(), tx, &mut self.bank),
            (Ok(()), None) => Err(ModbusError::configuration(format!(
                "transaction index {} out of range",
                index
            ))),
            (Err(err), _) => Err(err),
        };
        Some(self.complete(index, outcome))
    }

    /// Drain the line into the frame buffer, one 1.5 character wait per byte.
    ///
    /// Bytes beyond the buffer capacity are read and dropped so the slave is
    /// never left mid-frame.
    fn receive_frame(&mut self) -> ModbusResult<()> {
        self.buffer.clear();
        let mut received = 0;
        let mut overflow = false;

        while received < MAX_ADU_SIZE && self.transport.bytes_available()? > 0 {
            let byte = self.transport.read_byte()?;
            received += 1;
            if self.buffer.push(byte).is_err() {
                overflow = true;
            }
            self.clock.sleep_micros(self.timing.t1_5_us);
        }

        if overflow {
            warn!(
                "[MODBUS-RTU] reply of {} bytes overflowed the frame buffer",
                received
            );
            self.buffer.clear();
            return Err(FrameError::BufferOverflow.into());
        }
        if self.buffer.len() < MIN_RESPONSE_LEN {
            self.buffer.trace("RX (short)");
            return Err(FrameError::TooShort {
                len: self.buffer.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Apply an outcome to its transaction and the engine totals
    fn complete(&mut self, index: usize, outcome: Outcome) -> Completion {
        let retry_limit = self.config.retry_limit;
        if let Some(tx) = self.table.get_mut(index) {
            match &outcome {
                Ok(_) => tx.record_success(),
                Err(err) => {
                    debug!(
                        unit_id = tx.unit_id,
                        function = %tx.function,
                        "[MODBUS-RTU] transaction {} failed: {}",
                        index,
                        err
                    );
                    tx.record_failure(err, retry_limit);
                }
            }
        }
        if outcome.is_err() {
            self.total_failed = self.total_failed.wrapping_add(1);
        }

        self.state = match self.mode {
            ScheduleMode::Automatic => MasterState::Turnaround {
                since: self.clock.now(),
            },
            ScheduleMode::Manual => MasterState::Idle,
        };

        let completion = Completion { index, outcome };
        self.last_completion = Some(completion.clone());
        completion
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::crc_bytes;
    use crate::codec::Reply;
    use crate::error::ExceptionCode;
    use crate::function::FunctionCode;
    use crate::mock::{MockClock, MockTransport, TransportEvent};
    use crate::transaction::Transaction;

    type TestMaster = ModbusMaster<MockTransport, MockClock>;

    fn reply(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc_bytes(body));
        frame
    }

    fn read_reply(unit_id: u8, values: &[u16]) -> Vec<u8> {
        let mut body = vec![unit_id, 0x03, (values.len() * 2) as u8];
        for value in values {
            body.extend_from_slice(&value.to_be_bytes());
        }
        reply(&body)
    }

    fn master(config: MasterConfig) -> TestMaster {
        ModbusMaster::new(MockTransport::new(), MockClock::new(), config).unwrap()
    }

    fn read_table(count: u16) -> TransactionTable {
        (0..count)
            .map(|i| Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0x0100 + i, 1, i))
            .collect()
    }

    /// Tick until a cycle completes
    fn run_cycle(master: &mut TestMaster) -> Completion {
        for _ in 0..16 {
            if let Some(done) = master.tick().unwrap() {
                return done;
            }
        }
        panic!("no completion after 16 ticks");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = ModbusMaster::new(
            MockTransport::new(),
            MockClock::new(),
            MasterConfig::new().with_retry_limit(0),
        );
        assert!(matches!(result, Err(ModbusError::Configuration { .. })));
    }

    #[test]
    fn test_configure_rejects_window_outside_bank() {
        let mut master = master(MasterConfig::default());
        let result = master.configure(read_table(4), RegisterBank::new(3));
        assert!(matches!(result, Err(ModbusError::Configuration { .. })));
    }

    #[test]
    fn test_round_robin_visits_each_in_order() {
        let mut master = master(MasterConfig::new().with_polling_interval(Duration::ZERO));
        master.configure(read_table(3), RegisterBank::new(3)).unwrap();
        for value in [10, 20, 30, 40] {
            master.transport_mut().respond_with(&read_reply(1, &[value]));
        }

        let order: Vec<usize> = (0..4).map(|_| run_cycle(&mut master).index).collect();
        assert_eq!(order, vec![0, 1, 2, 0]);

        let addresses: Vec<u8> = master.transport().written().iter().map(|f| f[3]).collect();
        assert_eq!(addresses, vec![0x00, 0x01, 0x02, 0x00]);
        assert_eq!(master.registers().as_slice(), &[40, 20, 30]);
        assert_eq!(master.total_requests(), 4);
        assert_eq!(master.total_failed(), 0);
        assert!(master.last_succeeded());
    }

    #[test]
    fn test_disabled_transactions_are_skipped() {
        let mut master = master(MasterConfig::new().with_polling_interval(Duration::ZERO));
        let mut table = read_table(3);
        table.disable(1).unwrap();
        master.configure(table, RegisterBank::new(3)).unwrap();
        for _ in 0..3 {
            master.transport_mut().respond_with(&read_reply(1, &[1]));
        }

        let order: Vec<usize> = (0..3).map(|_| run_cycle(&mut master).index).collect();
        assert_eq!(order, vec![0, 2, 0]);
    }

    #[test]
    fn test_no_enabled_transactions_is_not_an_error() {
        let mut master = master(MasterConfig::default());
        let mut table = read_table(2);
        table.disable(0).unwrap();
        table.disable(1).unwrap();
        master.configure(table, RegisterBank::new(2)).unwrap();

        assert_eq!(master.tick().unwrap(), None);
        assert_eq!(master.state(), MasterState::Idle);
        assert!(master.transport().written().is_empty());
    }

    #[test]
    fn test_send_sequence_and_settle_delay() {
        let mut master = master(MasterConfig::new().with_baud_rate(9600));
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();

        assert_eq!(master.tick().unwrap(), None);
        assert!(matches!(master.state(), MasterState::AwaitingReply { index: 0, .. }));
        assert_eq!(
            master.transport().events(),
            &[
                TransportEvent::TransmitEnabled(true),
                TransportEvent::Write(8),
                TransportEvent::Flush,
                TransportEvent::TransmitEnabled(false),
            ]
        );
        assert_eq!(master.clock().sleeps(), vec![3124]);
        assert_eq!(master.table()[0].requests_sent, 1);
    }

    #[test]
    fn test_timeout_disables_after_retry_limit() {
        let timeout = Duration::from_millis(100);
        let polling = Duration::from_millis(50);
        let mut master = master(
            MasterConfig::new()
                .with_response_timeout(timeout)
                .with_polling_interval(polling)
                .with_retry_limit(3),
        );
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();

        for attempt in 1..=3u8 {
            assert_eq!(master.tick().unwrap(), None);
            master.clock().advance(timeout);
            assert_eq!(master.tick().unwrap(), None, "timeout must be exceeded, not met");

            master.clock().advance(Duration::from_millis(1));
            let done = master.tick().unwrap().unwrap();
            assert_eq!(done.outcome, Err(ModbusError::timeout(100)));
            if attempt < 3 {
                assert_eq!(master.table()[0].retries_in_flight, attempt);
            }
            master.clock().advance(polling);
        }

        let tx = &master.table()[0];
        assert!(!tx.enabled);
        assert_eq!(tx.retries_in_flight, 0);
        assert_eq!(tx.failures, 3);
        assert_eq!(master.total_failed(), 3);

        assert_eq!(master.tick().unwrap(), None);
        assert_eq!(master.transport().written().len(), 3);

        master.table_mut().enable(0).unwrap();
        master.tick().unwrap();
        assert_eq!(master.transport().written().len(), 4);
    }

    #[test]
    fn test_success_resets_retry_counter() {
        let mut master = master(
            MasterConfig::new()
                .with_response_timeout(Duration::from_millis(10))
                .with_polling_interval(Duration::ZERO),
        );
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_silence();
        master.transport_mut().respond_with(&read_reply(1, &[0xBEEF]));

        master.tick().unwrap();
        master.clock().advance(Duration::from_millis(11));
        assert!(!run_cycle(&mut master).is_success());
        assert_eq!(master.table()[0].retries_in_flight, 1);

        let done = run_cycle(&mut master);
        assert_eq!(done.outcome, Ok(Reply::Registers { offset: 0, count: 1 }));
        let tx = &master.table()[0];
        assert_eq!(tx.retries_in_flight, 0);
        assert_eq!(tx.successes, 1);
        assert_eq!(tx.failures, 1);
        assert_eq!(master.registers().get(0), Some(0xBEEF));
    }

    #[test]
    fn test_polling_interval_throttles_next_send() {
        let polling = Duration::from_millis(200);
        let mut master = master(MasterConfig::new().with_polling_interval(polling));
        master.configure(read_table(2), RegisterBank::new(2)).unwrap();
        master.transport_mut().respond_with(&read_reply(1, &[1]));

        assert!(run_cycle(&mut master).is_success());
        assert!(!master.is_ready());

        master.clock().advance(Duration::from_millis(199));
        assert_eq!(master.tick().unwrap(), None);
        assert_eq!(master.transport().written().len(), 1);

        master.clock().advance(Duration::from_millis(1));
        assert!(master.is_ready());
        master.tick().unwrap();
        assert_eq!(master.transport().written().len(), 2);
    }

    #[test]
    fn test_exception_response_counted() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&reply(&[0x01, 0x83, 0x02]));

        let done = run_cycle(&mut master);
        assert_eq!(
            done.outcome,
            Err(ModbusError::exception(0x03, ExceptionCode::IllegalDataAddress))
        );
        let tx = &master.table()[0];
        assert_eq!(tx.exception_errors, 1);
        assert_eq!(tx.failures, 1);
        assert_eq!(tx.retries_in_flight, 1);
        assert!(!master.last_succeeded());
    }

    #[test]
    fn test_id_mismatch_is_failure() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&read_reply(9, &[7]));

        let done = run_cycle(&mut master);
        assert_eq!(
            done.outcome,
            Err(FrameError::IdMismatch {
                expected: 1,
                actual: 9
            }
            .into())
        );
        assert_eq!(master.registers().get(0), Some(0));
    }

    #[test]
    fn test_overflow_contained_and_next_cycle_clean() {
        let mut master = master(MasterConfig::new().with_polling_interval(Duration::ZERO));
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&[0xAA; 100]);
        master.transport_mut().respond_with(&read_reply(1, &[0x1234]));

        let done = run_cycle(&mut master);
        assert_eq!(done.outcome, Err(FrameError::BufferOverflow.into()));
        assert_eq!(master.transport().pending_rx(), 0);

        let done = run_cycle(&mut master);
        assert!(done.is_success());
        assert_eq!(master.registers().get(0), Some(0x1234));
    }

    #[test]
    fn test_short_reply_is_frame_error() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&[0x01, 0x03, 0x00]);

        let done = run_cycle(&mut master);
        assert_eq!(done.outcome, Err(FrameError::TooShort { len: 3 }.into()));
    }

    #[test]
    fn test_stale_bytes_discarded_before_send() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().queue_reply(&read_reply(1, &[0xDEAD]));
        master.transport_mut().respond_with(&read_reply(1, &[0x0042]));

        assert!(run_cycle(&mut master).is_success());
        assert_eq!(master.registers().get(0), Some(0x0042));
    }

    #[test]
    fn test_response_time_measured() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();

        assert_eq!(master.response_time(), None);
        assert_eq!(master.tick().unwrap(), None);
        master.clock().advance(Duration::from_millis(12));
        master.transport_mut().queue_reply(&read_reply(1, &[1]));
        assert!(master.tick().unwrap().unwrap().is_success());
        assert_eq!(master.response_time(), Some(Duration::from_millis(12)));
    }

    #[test]
    fn test_write_single_register_echo() {
        let mut master = master(MasterConfig::default());
        let table: TransactionTable =
            vec![Transaction::new(1, FunctionCode::WriteSingleRegister, 0x0010, 0, 0)].into();
        master.configure(table, RegisterBank::new(1)).unwrap();
        master.registers_mut().set(0, 0x0102);
        master
            .transport_mut()
            .respond_with(&reply(&[0x01, 0x06, 0x00, 0x10, 0x01, 0x02]));

        let done = run_cycle(&mut master);
        assert_eq!(
            done.outcome,
            Ok(Reply::Echo {
                address: 0x0010,
                value: 0x0102
            })
        );
        assert_eq!(&master.transport().written()[0][4..6], &[0x01, 0x02]);
    }

    #[test]
    fn test_transport_failure_recorded_and_line_released() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().fail_writes(true);

        let done = master.tick().unwrap().unwrap();
        assert!(matches!(done.outcome, Err(ModbusError::Transport { .. })));
        assert_eq!(
            master.transport().events().last(),
            Some(&TransportEvent::TransmitEnabled(false))
        );
        assert_eq!(master.table()[0].failures, 1);
        assert!(matches!(master.state(), MasterState::Turnaround { .. }));
    }

    #[test]
    fn test_oversized_request_fails_locally() {
        let mut master = master(MasterConfig::default());
        let table: TransactionTable =
            vec![Transaction::new(1, FunctionCode::WriteMultipleRegisters, 0, 40, 0)].into();
        master.configure(table, RegisterBank::new(40)).unwrap();

        let done = master.tick().unwrap().unwrap();
        assert_eq!(done.outcome, Err(FrameError::BufferOverflow.into()));
        assert!(master.transport().written().is_empty());
        assert_eq!(master.total_requests(), 0);
        assert_eq!(master.total_failed(), 1);
    }

    #[test]
    fn test_manual_mode() {
        let mut master = master(MasterConfig::default());
        master.configure_manual(read_table(2), RegisterBank::new(2)).unwrap();

        assert!(matches!(master.tick(), Err(ModbusError::Configuration { .. })));

        assert_eq!(master.send_next().unwrap(), Some(0));
        assert_eq!(master.send_next(), Err(ModbusError::Busy));

        // no timeout in manual mode
        master.clock().advance(Duration::from_secs(60));
        assert_eq!(master.receive_pending().unwrap(), None);

        let failed = master.fail_pending().unwrap();
        assert!(failed.outcome.as_ref().is_err_and(ModbusError::is_timeout));
        assert_eq!(master.state(), MasterState::Idle);

        master.transport_mut().respond_with(&read_reply(1, &[0x0077]));
        assert_eq!(master.send_next().unwrap(), Some(1));
        let done = master.receive_pending().unwrap().unwrap();
        assert_eq!(done.index, 1);
        assert!(done.is_success());
        assert_eq!(master.registers().get(1), Some(0x0077));

        assert_eq!(master.send_next().unwrap(), Some(0));
        assert_eq!(master.total_requests(), 3);
        assert_eq!(master.total_failed(), 1);
    }

    #[test]
    fn test_manual_send_failure_returned() {
        let mut master = master(MasterConfig::default());
        master.configure_manual(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().fail_writes(true);

        assert!(matches!(
            master.send_next(),
            Err(ModbusError::Transport { .. })
        ));
        assert_eq!(master.table()[0].failures, 1);
        assert_eq!(master.state(), MasterState::Idle);
    }

    #[test]
    fn test_configured_mode_is_honoured() {
        let mut master = master(MasterConfig::new().with_mode(ScheduleMode::Manual));
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();

        assert_eq!(master.mode(), ScheduleMode::Manual);
        assert!(matches!(master.tick(), Err(ModbusError::Configuration { .. })));
        assert_eq!(master.send_next().unwrap(), Some(0));
    }

    #[test]
    fn test_configure_manual_overrides_then_configure_restores() {
        let mut master = master(MasterConfig::default());
        master.configure_manual(read_table(1), RegisterBank::new(1)).unwrap();
        assert_eq!(master.mode(), ScheduleMode::Manual);

        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        assert_eq!(master.mode(), ScheduleMode::Automatic);
        assert!(master.tick().is_ok());
    }

    #[test]
    fn test_one_tick_sends_and_receives() {
        let mut master = master(MasterConfig::default());
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&read_reply(1, &[0x0102]));

        let done = master.tick().unwrap().unwrap();
        assert!(done.is_success());
        assert_eq!(master.registers().get(0), Some(0x0102));
        assert_eq!(master.transport().written().len(), 1);
    }

    #[test]
    fn test_char_wait_after_each_received_byte() {
        let mut master = master(MasterConfig::new().with_baud_rate(9600));
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        let reply = read_reply(1, &[0x0001]);
        assert_eq!(reply.len(), 7);
        master.transport_mut().respond_with(&reply);

        assert!(run_cycle(&mut master).is_success());
        let mut expected = vec![3124];
        expected.extend([1562; 7]);
        assert_eq!(master.clock().sleeps(), expected);
    }

    #[test]
    fn test_char_wait_fixed_above_19200_baud() {
        let mut master = master(MasterConfig::new().with_baud_rate(38_400));
        master.configure(read_table(1), RegisterBank::new(1)).unwrap();
        master.transport_mut().respond_with(&read_reply(1, &[0x0001]));

        assert!(run_cycle(&mut master).is_success());
        let mut expected = vec![1500];
        expected.extend([750; 7]);
        assert_eq!(master.clock().sleeps(), expected);
    }
}
