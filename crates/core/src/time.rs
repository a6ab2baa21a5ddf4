use chrono::{DateTime, Duration, Utc};

/// Source of "now" for attempt timestamps.
///
/// Services take a `Clock` instead of calling `Utc::now()` so tests can pin
/// the time an attempt was acknowledged.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Whole seconds elapsed since `earlier`, zero if `earlier` is in the future.
    #[must_use]
    pub fn secs_since(&self, earlier: DateTime<Utc>) -> u64 {
        let elapsed = self.now().signed_duration_since(earlier).num_seconds();
        u64::try_from(elapsed).unwrap_or(0)
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = Clock::fixed(fixed_now());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.secs_since(fixed_now()), 90);
    }

    #[test]
    fn secs_since_future_is_zero() {
        let clock = Clock::fixed(fixed_now());
        assert_eq!(clock.secs_since(fixed_now() + Duration::seconds(5)), 0);
    }
}
