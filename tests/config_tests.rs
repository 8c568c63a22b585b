// ABOUTME: Tests for global configuration loading
// ABOUTME: Verifies TOML parsing, defaults, env var overrides, and validation

use chat_session::config::{GlobalConfig, LogFormat, LogLevel};
use serial_test::serial;
use std::io::Write;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for name in [
        "CHAT_SESSION_CONFIG_PATH",
        "CHAT_SESSION_LOG_LEVEL",
        "CHAT_SESSION_LOG_FORMAT",
        "CHAT_SESSION_USE_DEFAULT_LOGGER",
        "CHAT_SESSION_REGION",
        "CHAT_SESSION_STAGE",
        "CHAT_SESSION_ENDPOINT",
        "CHAT_SESSION_TELEMETRY_ENABLED",
        "CHAT_SESSION_EXPIRY_BUFFER_MS",
    ] {
        std::env::remove_var(name);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[logger]
use_default_logger = true
level = "debug"
format = "json"
advanced_log_writer = "info"

[telemetry]
enabled = false

[client]
region = "eu-west-2"
endpoint = "https://chat.example.test"

[polling]
expiry_buffer_ms = 30000
"#,
    );

    let config = GlobalConfig::load(Some(&path)).unwrap();

    assert!(config.logger.use_default_logger);
    assert_eq!(config.logger.level, LogLevel::Debug);
    assert_eq!(config.logger.format, LogFormat::Json);
    assert_eq!(config.logger.advanced_log_writer, LogLevel::Info);
    assert!(!config.telemetry.enabled);
    assert_eq!(config.telemetry.namespace, "chat_session");
    assert_eq!(config.client.region, "eu-west-2");
    assert_eq!(config.client.stage, "prod");
    assert_eq!(
        config.client.endpoint.as_deref(),
        Some("https://chat.example.test")
    );
    assert_eq!(config.polling.expiry_buffer_ms, 30_000);
    assert_eq!(config.polling.default_interval_ms, 12 * 60 * 60 * 1000);
}

#[test]
#[serial]
fn test_config_path_from_env_var() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[client]\nstage = \"gamma\"\n");
    std::env::set_var("CHAT_SESSION_CONFIG_PATH", path.to_str().unwrap());

    let config = GlobalConfig::load(None).unwrap();
    assert_eq!(config.client.stage, "gamma");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_missing_file_gives_defaults() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();

    let config = GlobalConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, GlobalConfig::default());
}

#[test]
#[serial]
fn test_env_vars_override_file() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[client]\nregion = \"eu-west-2\"\n");

    std::env::set_var("CHAT_SESSION_REGION", "ap-southeast-2");
    std::env::set_var("CHAT_SESSION_LOG_LEVEL", "WARN");
    std::env::set_var("CHAT_SESSION_TELEMETRY_ENABLED", "false");
    std::env::set_var("CHAT_SESSION_EXPIRY_BUFFER_MS", "5000");

    let config = GlobalConfig::load(Some(&path)).unwrap();
    assert_eq!(config.client.region, "ap-southeast-2");
    assert_eq!(config.logger.level, LogLevel::Warn);
    assert!(!config.telemetry.enabled);
    assert_eq!(config.polling.expiry_buffer_ms, 5_000);

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_invalid_env_value_is_rejected() {
    clear_config_env_vars();
    std::env::set_var("CHAT_SESSION_LOG_FORMAT", "xml");

    let err = GlobalConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("CHAT_SESSION_LOG_FORMAT"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_blank_region_fails_validation() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[client]\nregion = \"\"\n");

    let err = GlobalConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("client.region"));
}

#[test]
fn test_malformed_toml_is_an_error() {
    assert!(GlobalConfig::parse("[logger\nlevel = ").is_err());
    assert!(GlobalConfig::parse("[logger]\nlevel = \"verbose\"\n").is_err());
}
