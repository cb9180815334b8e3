// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! The engine needs two notions of time: a monotonic instant for measuring
//! its own budget, and wall-clock epoch milliseconds for host deadlines and
//! event timestamps. Both come from the same clock so a fake can move them
//! together.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    epoch_ms: u64,
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    /// Start at the given epoch milliseconds
    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                epoch_ms,
            })),
        }
    }

    pub fn new() -> Self {
        Self::at_epoch_ms(1_700_000_000_000)
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        current.epoch_ms += duration.as_millis() as u64;
    }

    /// Set the wall clock to specific epoch milliseconds
    ///
    /// The monotonic instant only moves forward, so setting the wall clock
    /// backwards leaves it untouched.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if epoch_ms > current.epoch_ms {
            let delta = Duration::from_millis(epoch_ms - current.epoch_ms);
            current.instant += delta;
        }
        current.epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .instant
    }

    fn epoch_ms(&self) -> u64 {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
