// ABOUTME: Clocks for tests: a frozen clock and one that follows tokio's (pausable) time.
// ABOUTME: TokioClock keeps wall-clock expiry math in step with paused tokio timers.

use crate::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn current() -> Self {
        Self(Utc::now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wall clock that advances with `tokio::time`, so `start_paused` tests
/// see expiry deltas shrink exactly as timers elapse.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc::now(),
            origin: tokio::time::Instant::now(),
        }
    }

    /// The tokio instant this clock treats as its zero
    pub fn origin(&self) -> tokio::time::Instant {
        self.origin
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.origin.elapsed();
        self.base + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero())
    }
}
