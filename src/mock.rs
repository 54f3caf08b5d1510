//! Scripted transport and manual clock for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::transport::{Clock, Transport};

/// Calls observed by [`MockTransport`], in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportEvent {
    TransmitEnabled(bool),
    Write(usize),
    Flush,
}

/// In-memory transport.
///
/// Bytes given to `queue_reply` are readable immediately. Replies given to
/// `respond_with` are delivered one per `write`, so they survive the stale
/// byte purge that precedes every send.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    rx: VecDeque<u8>,
    responses: VecDeque<Option<Vec<u8>>>,
    written: Vec<Vec<u8>>,
    events: Vec<TransportEvent>,
    fail_writes: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn queue_reply(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub(crate) fn respond_with(&mut self, bytes: &[u8]) {
        self.responses.push_back(Some(bytes.to_vec()));
    }

    pub(crate) fn respond_silence(&mut self) {
        self.responses.push_back(None);
    }

    pub(crate) fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub(crate) fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub(crate) fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    pub(crate) fn pending_rx(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.events.push(TransportEvent::Write(bytes.len()));
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        self.written.push(bytes.to_vec());
        if let Some(Some(reply)) = self.responses.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.events.push(TransportEvent::Flush);
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))
    }

    fn set_transmit_enabled(&mut self, enabled: bool) -> io::Result<()> {
        self.events.push(TransportEvent::TransmitEnabled(enabled));
        Ok(())
    }
}

/// Clock that only moves when told to, or when slept on.
#[derive(Debug, Default)]
pub(crate) struct MockClock {
    now: Cell<Duration>,
    sleeps: RefCell<Vec<u32>>,
}

impl MockClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub(crate) fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep_micros(&self, micros: u32) {
        self.sleeps.borrow_mut().push(micros);
        self.advance(Duration::from_micros(u64::from(micros)));
    }
}
