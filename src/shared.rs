//! Thread-safe handle to a [`ModbusMaster`]
//!
//! Encode, send and decode share one frame buffer, so every entry point is
//! serialized behind a single mutex. The register bank is reached through
//! the same lock; a reader never observes a half-decoded reply.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ModbusResult;
use crate::master::{Completion, ModbusMaster};
use crate::register::RegisterBank;
use crate::transport::{Clock, Transport};

/// Cloneable, lock-protected master
#[derive(Debug)]
pub struct SharedMaster<T: Transport, C: Clock> {
    inner: Arc<Mutex<ModbusMaster<T, C>>>,
}

impl<T: Transport, C: Clock> Clone for SharedMaster<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, C: Clock> SharedMaster<T, C> {
    pub fn new(master: ModbusMaster<T, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(master)),
        }
    }

    /// See [`ModbusMaster::tick`]
    pub fn tick(&self) -> ModbusResult<Option<Completion>> {
        self.lock().tick()
    }

    /// See [`ModbusMaster::send_next`]
    pub fn send_next(&self) -> ModbusResult<Option<usize>> {
        self.lock().send_next()
    }

    /// See [`ModbusMaster::receive_pending`]
    pub fn receive_pending(&self) -> ModbusResult<Option<Completion>> {
        self.lock().receive_pending()
    }

    /// See [`ModbusMaster::fail_pending`]
    pub fn fail_pending(&self) -> Option<Completion> {
        self.lock().fail_pending()
    }

    /// Run `f` with the register bank locked
    pub fn with_registers<R>(&self, f: impl FnOnce(&mut RegisterBank) -> R) -> R {
        f(self.lock().registers_mut())
    }

    /// Run `f` with the whole master locked
    pub fn with_master<R>(&self, f: impl FnOnce(&mut ModbusMaster<T, C>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ModbusMaster<T, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
