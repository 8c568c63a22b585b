// ABOUTME: Client-side telemetry: count metrics published through the metrics crate.
// ABOUTME: Metrics recorded before initialization are buffered and flushed on initialize().

use crate::config::TelemetryConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Metric emitted once per constructed session
pub const START_CHAT_SESSION: &str = "start_chat_session";

/// Upper bound on metrics held while telemetry is not yet initialized
const MAX_PENDING_METRICS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCategory {
    Ui,
    Api,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ui => "UI",
            Self::Api => "API",
        }
    }
}

/// A metric label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingMetric {
    name: String,
    category: MetricCategory,
    dimensions: Vec<Dimension>,
}

/// Fingerprint of the client environment attached to session-start metrics
pub fn environment_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::new("Browser", env!("CARGO_PKG_NAME")),
        Dimension::new("BrowserVersion", env!("CARGO_PKG_VERSION")),
        Dimension::new("Platform", std::env::consts::OS),
    ]
}

pub struct TelemetryService {
    config: RwLock<TelemetryConfig>,
    initialized: AtomicBool,
    pending: Mutex<Vec<PendingMetric>>,
    published: AtomicU64,
}

impl TelemetryService {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config: RwLock::new(config),
            initialized: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            published: AtomicU64::new(0),
        }
    }

    /// Start publishing. Buffered metrics are flushed; repeat calls do nothing.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        tracing::debug!(flushed = pending.len(), "Telemetry initialized");
        for metric in pending {
            self.publish(&metric);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn update_config(&self, config: TelemetryConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    /// Record a count of one for `name`
    pub fn add_count_metric(&self, name: &str, category: MetricCategory, dimensions: Vec<Dimension>) {
        let metric = PendingMetric {
            name: name.to_string(),
            category,
            dimensions,
        };

        if self.is_initialized() {
            self.publish(&metric);
            return;
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.len() < MAX_PENDING_METRICS {
            pending.push(metric);
        } else {
            tracing::debug!(metric = name, "Telemetry buffer full, dropping metric");
        }
    }

    /// Number of metrics handed to the metrics recorder so far
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn publish(&self, metric: &PendingMetric) {
        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        if !config.enabled {
            return;
        }

        let mut labels = vec![metrics::Label::new("category", metric.category.as_str())];
        labels.extend(
            metric
                .dimensions
                .iter()
                .map(|d| metrics::Label::new(d.name.clone(), d.value.clone())),
        );
        let key = format!("{}_{}", config.namespace, metric.name);
        metrics::counter!(key, labels).increment(1);
        self.published.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_buffer_until_initialized() {
        let telemetry = TelemetryService::default();
        telemetry.add_count_metric(START_CHAT_SESSION, MetricCategory::Ui, environment_dimensions());

        assert_eq!(telemetry.published_count(), 0);
        assert_eq!(telemetry.pending_count(), 1);

        telemetry.initialize();
        assert_eq!(telemetry.published_count(), 1);
        assert_eq!(telemetry.pending_count(), 0);
    }

    #[test]
    fn test_disabled_telemetry_publishes_nothing() {
        let telemetry = TelemetryService::new(TelemetryConfig {
            enabled: false,
            ..TelemetryConfig::default()
        });
        telemetry.initialize();
        telemetry.add_count_metric("anything", MetricCategory::Api, Vec::new());
        assert_eq!(telemetry.published_count(), 0);
    }

    #[test]
    fn test_pending_buffer_is_bounded() {
        let telemetry = TelemetryService::default();
        for _ in 0..(MAX_PENDING_METRICS + 10) {
            telemetry.add_count_metric("m", MetricCategory::Ui, Vec::new());
        }
        assert_eq!(telemetry.pending_count(), MAX_PENDING_METRICS);
    }

    #[test]
    fn test_environment_dimensions_names() {
        let names: Vec<String> = environment_dimensions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Browser", "BrowserVersion", "Platform"]);
    }
}
