// ABOUTME: Scripted ConnectionDetailsProvider for deterministic polling tests.
// ABOUTME: Queued outcomes decide each fetch; every fetch instant is recorded.

use crate::clock::Clock;
use crate::provider::ConnectionDetailsProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the next fetch should do
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Issue a new token valid for `lifetime` from the moment of the fetch
    Succeed { lifetime: TimeDelta },
    /// Fail with the given message, leaving the stored token untouched
    Fail(String),
}

#[derive(Debug, Default)]
struct State {
    token: Option<String>,
    expiry: Option<DateTime<Utc>>,
    outcomes: VecDeque<FetchOutcome>,
    fetches: Vec<tokio::time::Instant>,
    issued: u64,
}

/// Provider whose fetches follow a script.
///
/// Once the script runs out every fetch succeeds with `default_lifetime`.
pub struct MockConnectionProvider {
    clock: Arc<dyn Clock>,
    default_lifetime: TimeDelta,
    latency: Duration,
    state: Mutex<State>,
}

impl MockConnectionProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            default_lifetime: TimeDelta::hours(1),
            latency: Duration::ZERO,
            state: Mutex::new(State::default()),
        }
    }

    /// Seed the provider with an already-fetched token
    pub fn with_token(self, token: &str, expiry: DateTime<Utc>) -> Self {
        {
            let mut state = self.lock();
            state.token = Some(token.to_string());
            state.expiry = Some(expiry);
        }
        self
    }

    /// Lifetime used once scripted outcomes are exhausted
    pub fn with_default_lifetime(mut self, lifetime: TimeDelta) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Simulated network latency before each fetch resolves
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn then_succeed(self, lifetime: TimeDelta) -> Self {
        self.lock()
            .outcomes
            .push_back(FetchOutcome::Succeed { lifetime });
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.lock()
            .outcomes
            .push_back(FetchOutcome::Fail(message.to_string()));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches.len()
    }

    /// tokio instants at which each fetch started
    pub fn fetch_instants(&self) -> Vec<tokio::time::Instant> {
        self.lock().fetches.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ConnectionDetailsProvider for MockConnectionProvider {
    async fn fetch_connection_token(&self) -> Result<()> {
        let outcome = {
            let mut state = self.lock();
            state.fetches.push(tokio::time::Instant::now());
            state.outcomes.pop_front()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let lifetime = match outcome {
            Some(FetchOutcome::Fail(message)) => anyhow::bail!(message),
            Some(FetchOutcome::Succeed { lifetime }) => lifetime,
            None => self.default_lifetime,
        };

        let mut state = self.lock();
        state.issued += 1;
        state.token = Some(format!("mock-token-{}", state.issued));
        state.expiry = Some(self.clock.now() + lifetime);
        Ok(())
    }

    fn fetched_connection_token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    fn connection_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.lock().expiry
    }
}
