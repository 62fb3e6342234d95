//! Time sources used to stamp adds and removes.
//!
//! The set only ever asks a clock for `now()`. Callers must hand in a clock
//! that does not go backwards between writes to the same key; a regressing
//! clock breaks last-writer-wins ordering and is not detected here.

use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Monotonically non-decreasing integer time source.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in clock units.
    fn now(&self) -> i64;
}

/// Wall clock reporting nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        // Out of range only after the year 2262.
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Deterministic clock that only moves when told to.
///
/// Cloning yields a handle onto the same time, so a test can keep one copy
/// and give the other to a set.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Pin the clock to `time`.
    pub fn set(&self, time: i64) {
        self.now.store(time, Ordering::SeqCst);
    }

    /// Move the clock forward by `ticks` and return the new time.
    pub fn advance(&self, ticks: i64) -> i64 {
        self.now.fetch_add(ticks, Ordering::SeqCst) + ticks
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
