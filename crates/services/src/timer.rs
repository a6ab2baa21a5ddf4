//! Wall-clock pulse source for the exam countdown.
//!
//! The handle only emits one pulse per period; the session's `Countdown`
//! does the counting, so tests can skip the handle and tick directly.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Owns the background interval task. Dropping the handle stops it.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Start pulsing every second. The first pulse arrives one second from now.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn every_second() -> (Self, mpsc::Receiver<()>) {
        Self::with_period(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_period(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            // Catch up on pulses missed while the runtime was busy so the
            // countdown tracks elapsed time.
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        (Self { task }, rx)
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
