//! # Transport and Clock Adapters
//!
//! The master never touches hardware directly. It drives a byte-level
//! [`Transport`] (with a direction-control line for half-duplex RS-485
//! transceivers) and reads time from a [`Clock`].
//!
//! A request is always sent in this strict sequence:
//!
//! 1. `set_transmit_enabled(true)`
//! 2. `write(frame)`
//! 3. `flush()`
//! 4. `clock.sleep_micros(frame_delay)`
//! 5. `set_transmit_enabled(false)`

use std::io;
use std::time::{Duration, Instant};

/// Byte-level serial link used by the master.
pub trait Transport {
    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Block until every queued byte has been physically transmitted
    fn flush(&mut self) -> io::Result<()>;

    /// Number of received bytes that can be read without blocking
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one received byte
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Drive the transceiver's direction-control line
    fn set_transmit_enabled(&mut self, enabled: bool) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn set_transmit_enabled(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_transmit_enabled(enabled)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn set_transmit_enabled(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_transmit_enabled(enabled)
    }
}

/// Monotonic time source and bounded micro-delay.
pub trait Clock {
    /// Monotonic time since an arbitrary, fixed origin
    fn now(&self) -> Duration;

    /// Busy-wait for `micros` microseconds
    fn sleep_micros(&self, micros: u32);

    /// Time elapsed since `since`, saturating at zero
    fn elapsed_since(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep_micros(&self, micros: u32) {
        (**self).sleep_micros(micros)
    }
}

/// [`Clock`] backed by [`std::time::Instant`].
///
/// `sleep_micros` spins instead of yielding to the OS scheduler; sleeps of
/// a few hundred microseconds are not reliably honoured by `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_micros(&self, micros: u32) {
        let deadline = Instant::now() + Duration::from_micros(u64::from(micros));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
