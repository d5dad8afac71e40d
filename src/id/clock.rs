//! Millisecond clock sources for identifier generation

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// A wall clock with millisecond resolution.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current Unix time in milliseconds
    fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Used to reproduce clock regressions and same-millisecond bursts.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Sets the current time, which may move it backwards.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward for negative deltas).
    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_default_epoch() {
        assert!(SystemClock.now_millis() > super::super::layout::DEFAULT_EPOCH_MILLIS);
    }

    #[test]
    fn test_manual_clock_moves_both_ways() {
        let clock = ManualClock::new(1_000);
        clock.advance(5);
        assert_eq!(clock.now_millis(), 1_005);
        clock.set(900);
        assert_eq!(clock.now_millis(), 900);
    }
}
