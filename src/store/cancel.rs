//! Per-call cancellation for store operations.
//!
//! A [`Cancel`] carries an optional deadline and a shared flag.  The store
//! checks it only while waiting for its lock: once the lock is held the
//! operation always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};

/// How long a single timed lock attempt waits before re-checking the flag.
const LOCK_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
pub struct Cancel {
    deadline: Option<Instant>,
    flag: Arc<AtomicBool>,
}

impl Cancel {
    /// Never cancelled, no deadline.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Cancel this value and every clone of it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// The next wait slice, bounded by the deadline.
    fn slice(&self) -> Duration {
        match self.deadline {
            Some(d) => d.saturating_duration_since(Instant::now()).min(LOCK_SLICE),
            None => LOCK_SLICE,
        }
    }

    pub(crate) fn read<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockReadGuard<'a, T>> {
        loop {
            self.check()?;
            if let Some(guard) = lock.try_read_for(self.slice()) {
                return Ok(guard);
            }
        }
    }

    pub(crate) fn write<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockWriteGuard<'a, T>> {
        loop {
            self.check()?;
            if let Some(guard) = lock.try_write_for(self.slice()) {
                return Ok(guard);
            }
        }
    }
}
