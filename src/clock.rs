//! Time source abstraction.
//!
//! Every component that windows, expires or stamps data reads time through a
//! [`Clock`] instead of calling `Utc::now()` directly. Production uses
//! [`SystemClock`]; tests drive a [`ManualClock`] so windows and TTLs can be
//! crossed without sleeping.
//!
//! # Invariants
//!
//! - `now_ms()` is Unix time in milliseconds.
//! - A `ManualClock` only moves when told to, and never backwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Shared clock handle injected into every component.
pub type SharedClock = Arc<dyn Clock>;

pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> i64;

    /// Current Unix time in whole seconds.
    fn now_secs(&self) -> i64 {
        self.now_ms().div_euclid(1000)
    }
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(1_704_067_200_000)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Convert a duration to whole milliseconds for score arithmetic.
pub(crate) fn millis(duration: Duration) -> i64 {
    duration.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10_000);
        assert_eq!(clock.now_ms(), 10_000);
        assert_eq!(clock.now_secs(), 10);

        clock.advance(Duration::from_millis(2_500));
        assert_eq!(clock.now_ms(), 12_500);
        assert_eq!(clock.now_secs(), 12);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_secs() > 1_577_836_800);
    }
}
