// ABOUTME: ConnectionDetailsProvider trait - the single source of truth for token freshness.
// ABOUTME: Implemented by the transport layer; the lifecycle helper only reads through it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Supplies and refreshes the connection token for a chat transport.
///
/// `fetch_connection_token` replaces the provider's stored token and expiry;
/// the getters return whatever was fetched last.
#[async_trait]
pub trait ConnectionDetailsProvider: Send + Sync {
    /// Fetch a fresh connection token from the service
    async fn fetch_connection_token(&self) -> Result<()>;

    /// The most recently fetched token, if any
    fn fetched_connection_token(&self) -> Option<String>;

    /// Expiry of the most recently fetched token, if known
    fn connection_token_expiry(&self) -> Option<DateTime<Utc>>;
}
