//! Time source abstraction
//!
//! The matcher never reads a clock itself: the command loop samples
//! `now()` once per command and threads the value through, which keeps
//! trade timestamps non-decreasing and makes matching replayable under a
//! test clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A monotonic, non-decreasing time source in Unix nanoseconds.
pub trait Clock: Send + Sync {
    /// Current time in Unix nanoseconds. Never decreases.
    fn now(&self) -> i64;
}

/// Production clock: a wall-clock anchor captured once, advanced by the
/// platform's monotonic timer. Immune to wall-clock steps after startup.
#[derive(Debug)]
pub struct MonotonicClock {
    base_nanos: i64,
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let base_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Self {
            base_nanos,
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> i64 {
        self.base_nanos + self.started.elapsed().as_nanos() as i64
    }
}

/// Manually driven clock for tests and simulation.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new(start_nanos: i64) -> Self {
        Self {
            nanos: AtomicI64::new(start_nanos),
        }
    }

    /// Jump to an absolute timestamp
    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Move forward by `nanos`
    pub fn advance(&self, nanos: i64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
