// ABOUTME: Test doubles for connection polling: deterministic clocks and a scripted provider.
// ABOUTME: Used by this crate's tests and by downstream crates wiring helpers into sessions.

pub mod clock;
pub mod mock_provider;

pub use clock::{FixedClock, TokioClock};
pub use mock_provider::{FetchOutcome, MockConnectionProvider};
