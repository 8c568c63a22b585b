// ABOUTME: Tracing subscriber setup driven by LoggerConfig.
// ABOUTME: Installs nothing unless use_default_logger is set; the installed level can be reloaded.

use crate::config::{LogFormat, LogLevel, LoggerConfig};
use crate::types::LogMetaData;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "chat-session.log";

/// Control over the subscriber installed by [`init`].
///
/// The level can be changed while running. Format and log directory are fixed
/// once installed.
pub struct LoggerHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    guard: Option<WorkerGuard>,
}

impl LoggerHandle {
    /// Swap the active filter for one at `level`
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        self.filter
            .reload(build_filter(level))
            .context("Failed to reload log filter")?;
        tracing::debug!(level = level.as_str(), "Log level updated");
        Ok(())
    }
}

impl std::fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("file_logging", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}

fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global tracing subscriber described by `config`.
///
/// Keep the returned handle alive for as long as file logs should be flushed.
/// Returns `Ok(None)` without touching anything when `use_default_logger` is
/// false or another subscriber is already set.
pub fn init(config: &LoggerConfig) -> Result<Option<LoggerHandle>> {
    if !config.use_default_logger {
        return Ok(None);
    }

    let (filter, filter_handle) = reload::Layer::new(build_filter(config.level));

    let (text_layer, json_layer) = match config.format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::debug!(level = config.level.as_str(), "Default logger installed");
            Ok(Some(LoggerHandle {
                filter: filter_handle,
                guard,
            }))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Tracing subscriber already installed, keeping it");
            Ok(None)
        }
    }
}

/// Write a session lifecycle line at the configured advanced log level
pub fn log_advanced(level: LogLevel, message: &str, meta: &LogMetaData) {
    match level {
        LogLevel::Debug => tracing::debug!(
            contact_id = %meta.contact_id,
            participant_id = %meta.participant_id,
            session_type = %meta.session_type,
            "{}", message
        ),
        LogLevel::Info => tracing::info!(
            contact_id = %meta.contact_id,
            participant_id = %meta.participant_id,
            session_type = %meta.session_type,
            "{}", message
        ),
        LogLevel::Warn => tracing::warn!(
            contact_id = %meta.contact_id,
            participant_id = %meta.participant_id,
            session_type = %meta.session_type,
            "{}", message
        ),
        LogLevel::Error => tracing::error!(
            contact_id = %meta.contact_id,
            participant_id = %meta.participant_id,
            session_type = %meta.session_type,
            "{}", message
        ),
    }
}
