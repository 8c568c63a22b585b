// ABOUTME: ConnectionLifecycleHelper keeps a connection token fresh by polling before expiry.
// ABOUTME: One polling task per helper; end() cancels it and blocks any later reschedule.

use crate::clock::{Clock, SystemClock};
use crate::config::PollingConfig;
use crate::provider::ConnectionDetailsProvider;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

/// Drives connection token refresh for one transport connection.
///
/// The first tick after [`start`](Self::start) only waits out the current
/// token's time-to-expiry. Every later tick fetches a token: on success the
/// next wait is recomputed from the new expiry, on failure the wait that just
/// elapsed is reused. Failures never stop the loop; only [`end`](Self::end) does.
pub struct ConnectionLifecycleHelper {
    poller: Poller,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the spawned polling task
#[derive(Clone)]
struct Poller {
    provider: Arc<dyn ConnectionDetailsProvider>,
    clock: Arc<dyn Clock>,
    config: PollingConfig,
    cancel: CancellationToken,
    span: Span,
}

impl ConnectionLifecycleHelper {
    pub fn new(provider: Arc<dyn ConnectionDetailsProvider>, config: PollingConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn ConnectionDetailsProvider>,
        config: PollingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            poller: Poller {
                provider,
                clock,
                config,
                cancel: CancellationToken::new(),
                span: tracing::info_span!("connection_helper"),
            },
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Attach a span carrying session log metadata to every polling log line
    pub fn with_span(mut self, span: Span) -> Self {
        self.poller.span = span;
        self
    }

    /// Begin polling. Calling again after the first start does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let poller = self.poller.clone();
        let span = poller.span.clone();
        let handle = tokio::spawn(poller.run().instrument(span));
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop polling. Safe to call any number of times.
    ///
    /// A fetch already in flight is allowed to finish but will not schedule
    /// another tick.
    pub fn end(&self) {
        if !self.poller.cancel.is_cancelled() {
            let _guard = self.poller.span.enter();
            tracing::info!("Ending connection token polling");
        }
        self.poller.cancel.cancel();
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_ended(&self) -> bool {
        self.poller.cancel.is_cancelled()
    }

    /// Whether the polling task is still alive
    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn connection_token(&self) -> Option<String> {
        self.poller.provider.fetched_connection_token()
    }

    pub fn connection_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.poller.provider.connection_token_expiry()
    }

    /// `(expiry - now) - buffer`. Negative when the token is expired or inside
    /// the buffer; None when the provider has no expiry.
    pub fn time_to_connection_token_expiry(&self) -> Option<TimeDelta> {
        self.poller.time_to_expiry()
    }
}

impl Drop for ConnectionLifecycleHelper {
    fn drop(&mut self) {
        self.poller.cancel.cancel();
    }
}

impl Poller {
    fn time_to_expiry(&self) -> Option<TimeDelta> {
        let expiry = self.provider.connection_token_expiry()?;
        Some(expiry - self.clock.now() - self.config.expiry_buffer())
    }

    /// Delay until the next tick, derived from the provider's current expiry
    fn delay_from_expiry(&self) -> Duration {
        match self.time_to_expiry() {
            // Negative deltas fail to convert and fire immediately
            Some(delta) => delta.to_std().unwrap_or(Duration::ZERO),
            None => {
                tracing::warn!(
                    interval_ms = self.config.default_interval_ms,
                    "Connection token has no expiry, using default polling interval"
                );
                self.config.default_interval()
            }
        }
    }

    async fn run(self) {
        tracing::info!("First time polling connection token");
        let mut delay = self.delay_from_expiry();

        loop {
            tracing::debug!(delay_ms = millis(delay), "Scheduled connection token poll");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.provider.fetch_connection_token().await {
                Ok(()) => {
                    tracing::info!("Connection token polling succeeded");
                    delay = self.delay_from_expiry();
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        retry_in_ms = millis(delay),
                        "Failed to fetch connection token during polling"
                    );
                }
            }

            if self.cancel.is_cancelled() {
                tracing::debug!("Polling ended while fetching, not rescheduling");
                break;
            }
        }
    }
}

/// Milliseconds for log fields, saturating instead of truncating
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
