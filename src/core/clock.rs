//! Clock implementations

use crate::core::traits::Clock;
use crate::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Times before the epoch clamp to 0
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Clock that only moves when told to
///
/// Used by tests and by journal replay, where every row carries its own time.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        FixedClock {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&self, seconds: u64) {
        // fetch_update never fails when the closure always returns Some
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(seconds))
            });
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let clock = FixedClock::new(10);
        assert_eq!(clock.now(), 10);

        clock.advance(86_400);
        assert_eq!(clock.now(), 86_410);

        clock.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn test_fixed_clock_advance_saturates() {
        let clock = FixedClock::new(u64::MAX - 1);
        clock.advance(10);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn test_system_clock_is_after_2023() {
        assert!(SystemClock.now() > 1_672_531_200);
    }
}
