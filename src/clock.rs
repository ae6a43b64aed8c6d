//! The source of the current time used to stamp records.

use std::{
    fmt::Debug,
    sync::{Mutex, PoisonError},
};

use time::{Duration, OffsetDateTime};

/// Supplies the timestamps written to `created_at`, `updated_at` and `deleted_at`.
pub trait Clock: Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> OffsetDateTime;
}

/// A [Clock] that reads the system time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A [Clock] that always returns the same time until it is moved with
/// [FixedClock::set] or [FixedClock::advance].
#[derive(Debug)]
pub struct FixedClock(Mutex<OffsetDateTime>);

impl FixedClock {
    /// Create a clock stopped at `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self(Mutex::new(now))
    }

    /// Stop the clock at `now`.
    pub fn set(&self, now: OffsetDateTime) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *now += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod fixed_clock_tests {
    use time::{Duration, macros::datetime};

    use super::{Clock, FixedClock};

    #[test]
    fn returns_the_same_time_until_moved() {
        let clock = FixedClock::new(datetime!(2024-01-01 00:00 UTC));

        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), datetime!(2024-01-01 00:00 UTC));
    }

    #[test]
    fn advance_moves_the_clock_forward() {
        let clock = FixedClock::new(datetime!(2024-01-01 00:00 UTC));

        clock.advance(Duration::minutes(90));

        assert_eq!(clock.now(), datetime!(2024-01-01 01:30 UTC));
    }
}
