// ABOUTME: Connection lifecycle for chat transports: token polling ahead of expiry.
// ABOUTME: Defines the provider seam, status/event vocabulary, and test doubles.

pub mod clock;
pub mod config;
pub mod helper;
pub mod provider;
pub mod status;

pub mod testing;

pub use clock::{Clock, SystemClock};
pub use config::PollingConfig;
pub use helper::ConnectionLifecycleHelper;
pub use provider::ConnectionDetailsProvider;
pub use status::{
    ConnectionHelperEvent, ConnectionHelperStatus, ConnectionInfoType, ConnectionStatusTracker,
};
