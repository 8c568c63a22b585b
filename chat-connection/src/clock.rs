// ABOUTME: Wall-clock abstraction used to measure time left on a connection token.
// ABOUTME: SystemClock reads chrono's UTC clock; tests swap in a clock tied to tokio time.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of "now" for expiry arithmetic
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
