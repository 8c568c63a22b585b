// ABOUTME: Polling configuration for connection token refresh.
// ABOUTME: Holds the fallback polling interval and the safety buffer subtracted from expiry.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs for [`crate::ConnectionLifecycleHelper`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay used when the provider reports no token expiry
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
    /// How long before actual expiry a refresh should happen
    #[serde(default = "default_expiry_buffer_ms")]
    pub expiry_buffer_ms: u64,
}

fn default_interval_ms() -> u64 {
    12 * 60 * 60 * 1000 // 12 hours
}

fn default_expiry_buffer_ms() -> u64 {
    60 * 1000 // 1 minute
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            expiry_buffer_ms: default_expiry_buffer_ms(),
        }
    }
}

impl PollingConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    pub fn expiry_buffer(&self) -> TimeDelta {
        TimeDelta::milliseconds(i64::try_from(self.expiry_buffer_ms).unwrap_or(i64::MAX / 1000))
    }
}
