//! Deterministic exam countdown.
//!
//! The countdown knows nothing about wall-clock time: callers feed it one
//! `tick()` per elapsed second. This keeps the expiry rules testable without
//! sleeping.

use std::fmt;

/// Default near-expiry threshold (five minutes).
pub const DEFAULT_WARNING_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the new remaining seconds.
    Running(u32),
    /// Reached zero on this tick. Returned exactly once per countdown.
    Expired,
    /// Not running (never started, already expired, or stopped).
    Idle,
}

/// Remaining-time counter with a one-shot expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    warning_secs: u32,
    state: CountdownState,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_SECS)
    }
}

impl Countdown {
    #[must_use]
    pub fn new(warning_secs: u32) -> Self {
        Self {
            remaining: 0,
            warning_secs,
            state: CountdownState::Idle,
        }
    }

    /// Begin counting down from `initial_secs`.
    ///
    /// Ignored once the countdown has expired or been stopped; an expired
    /// countdown never resumes.
    pub fn start(&mut self, initial_secs: u32) {
        if self.state != CountdownState::Idle {
            return;
        }
        self.remaining = initial_secs;
        self.state = CountdownState::Running;
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            return Tick::Expired;
        }
        Tick::Running(self.remaining)
    }

    /// Halt without expiring (used after a successful submission).
    pub fn stop(&mut self) {
        if self.state == CountdownState::Running || self.state == CountdownState::Idle {
            self.state = CountdownState::Stopped;
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    /// True once remaining time is at or under the warning threshold.
    #[must_use]
    pub fn is_near_expiry(&self) -> bool {
        self.state != CountdownState::Idle && self.remaining <= self.warning_secs
    }

    #[must_use]
    pub fn warning_secs(&self) -> u32 {
        self.warning_secs
    }

    /// `MM:SS` rendering of the remaining time.
    #[must_use]
    pub fn display(&self) -> ClockFace {
        ClockFace(self.remaining)
    }
}

/// Formats seconds as `MM:SS`. Minutes are not wrapped into hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFace(pub u32);

impl fmt::Display for ClockFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}
