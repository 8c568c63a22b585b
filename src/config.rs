// ABOUTME: Global configuration parsed from TOML with environment variable overrides
// ABOUTME: Covers logger, telemetry, client defaults, and token polling; shared via SharedConfig
use anyhow::{Context, Result};
use chat_connection::PollingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => anyhow::bail!("Unknown log level: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Install this crate's tracing subscriber. Leave off when the host
    /// application brings its own subscriber.
    #[serde(default)]
    pub use_default_logger: bool,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    /// Also write logs to a daily-rolling file in this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Level that advanced (session lifecycle) log lines are written at
    #[serde(default = "default_advanced_log_writer")]
    pub advanced_log_writer: LogLevel,
}

fn default_advanced_log_writer() -> LogLevel {
    LogLevel::Warn
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            use_default_logger: false,
            level: LogLevel::default(),
            format: LogFormat::default(),
            log_dir: None,
            advanced_log_writer: default_advanced_log_writer(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Prefix for metric names
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "chat_session".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: default_namespace(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_stage")]
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_stage() -> String {
    "prod".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            stage: default_stage(),
            endpoint: None,
        }
    }
}

impl GlobalConfig {
    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load from `path` (or `CHAT_SESSION_CONFIG_PATH`), then apply
    /// environment overrides and validate. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CHAT_SESSION_CONFIG_PATH").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            _ => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("CHAT_SESSION_LOG_LEVEL") {
            self.logger.level = val.parse()?;
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_LOG_FORMAT") {
            self.logger.format = match val.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => anyhow::bail!("CHAT_SESSION_LOG_FORMAT must be 'text' or 'json', got: {}", val),
            };
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_USE_DEFAULT_LOGGER") {
            self.logger.use_default_logger = parse_bool("CHAT_SESSION_USE_DEFAULT_LOGGER", &val)?;
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_REGION") {
            self.client.region = val;
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_STAGE") {
            self.client.stage = val;
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_ENDPOINT") {
            self.client.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_TELEMETRY_ENABLED") {
            self.telemetry.enabled = parse_bool("CHAT_SESSION_TELEMETRY_ENABLED", &val)?;
        }
        if let Ok(val) = std::env::var("CHAT_SESSION_EXPIRY_BUFFER_MS") {
            self.polling.expiry_buffer_ms = val.parse().with_context(|| {
                format!("CHAT_SESSION_EXPIRY_BUFFER_MS must be a number, got: {}", val)
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.client.region.trim().is_empty() {
            anyhow::bail!("client.region is required (set in config or CHAT_SESSION_REGION env var)");
        }
        if self.telemetry.namespace.trim().is_empty() {
            anyhow::bail!("telemetry.namespace must not be empty");
        }
        if self.polling.expiry_buffer_ms >= self.polling.default_interval_ms {
            anyhow::bail!(
                "polling.expiry_buffer_ms ({}) must be smaller than polling.default_interval_ms ({})",
                self.polling.expiry_buffer_ms,
                self.polling.default_interval_ms
            );
        }
        Ok(())
    }
}

fn parse_bool(name: &str, val: &str) -> Result<bool> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false, got: {}", name, val),
    }
}

/// Process-wide configuration handle, cloned into every component that
/// needs it. Replacing it swaps the whole config at once.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<Arc<GlobalConfig>>>);

impl SharedConfig {
    pub fn new(config: GlobalConfig) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(config))))
    }

    pub fn current(&self) -> Arc<GlobalConfig> {
        Arc::clone(&self.0.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn replace(&self, config: GlobalConfig) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = GlobalConfig::parse("").unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert!(!config.logger.use_default_logger);
        assert_eq!(config.logger.advanced_log_writer, LogLevel::Warn);
        assert_eq!(config.client.region, "us-west-2");
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_validate_rejects_buffer_not_below_interval() {
        let mut config = GlobalConfig::default();
        config.polling.expiry_buffer_ms = config.polling.default_interval_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_config_replace_is_visible_to_clones() {
        let shared = SharedConfig::new(GlobalConfig::default());
        let clone = shared.clone();

        let mut updated = GlobalConfig::default();
        updated.client.region = "eu-central-1".to_string();
        shared.replace(updated);

        assert_eq!(clone.current().client.region, "eu-central-1");
    }
}
