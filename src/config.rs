//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hub::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Upper bound on a single WebSocket write before the connection is dropped
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_send_timeout() -> u64 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_body_size: default_max_body_size(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Nothing is logged here, since this runs before the subscriber is
    /// installed. The returned `ConfigSource` says which file won and which
    /// were skipped, for the caller to report once logging is up.
    pub fn load_default() -> (Self, ConfigSource) {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("telemetry-hub").join("config.toml")),
            Some(PathBuf::from("/etc/telemetry-hub/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    fn load_first(paths: &[PathBuf]) -> (Self, ConfigSource) {
        let mut source = ConfigSource::default();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    source.path = Some(path.clone());
                    return (config, source);
                }
                Err(e) => source.skipped.push(e),
            }
        }

        // Fall back to environment-only config
        (Self::from_env(), source)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = lookup("TELEMETRY_HUB_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("TELEMETRY_HUB_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }
        if let Some(ms) = lookup("TELEMETRY_HUB_SEND_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.api.send_timeout_ms = ms;
        }

        // Hub overrides
        if let Some(buffer) = lookup("TELEMETRY_HUB_SUBSCRIBER_BUFFER").and_then(|v| v.parse().ok())
        {
            self.hub.subscriber_buffer = buffer;
        }

        // Logging overrides
        if let Some(level) = lookup("TELEMETRY_HUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TELEMETRY_HUB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Where `Config::load_default` found its settings
#[derive(Debug, Default)]
pub struct ConfigSource {
    /// The file that was loaded, `None` when running on defaults and env
    pub path: Option<PathBuf>,

    /// Files that exist but could not be loaded, in search order
    pub skipped: Vec<ConfigError>,
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Telemetry Hub Configuration
#
# Environment variables override these settings:
# - TELEMETRY_HUB_HOST
# - TELEMETRY_HUB_PORT
# - TELEMETRY_HUB_SEND_TIMEOUT_MS
# - TELEMETRY_HUB_SUBSCRIBER_BUFFER
# - TELEMETRY_HUB_LOG_LEVEL
# - TELEMETRY_HUB_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3001

# Allowed CORS origins (empty allows any origin)
cors_origins = []

# Maximum ingest request body (bytes)
max_body_size = 1048576

# Longest a single WebSocket write may take before the connection is dropped (ms)
send_timeout_ms = 5000

[hub]
# Readings buffered per subscriber; a subscriber that falls further behind
# misses readings instead of slowing everyone else down
subscriber_buffer = 256

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.api.addr(), "0.0.0.0:3001");
        assert!(config.api.cors_origins.is_empty());
        assert_eq!(config.api.send_timeout(), Duration::from_secs(5));
        assert_eq!(config.hub.subscriber_buffer, 256);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.api.port, defaults.api.port);
        assert_eq!(config.api.max_body_size, defaults.api.max_body_size);
        assert_eq!(config.hub.subscriber_buffer, defaults.hub.subscriber_buffer);
        assert_eq!(config.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse("[hub]\nsubscriber_buffer = 8\n").unwrap();
        assert_eq!(config.hub.subscriber_buffer, 8);
        assert_eq!(config.api.port, 3001);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = 9000\ncors_origins = [\"http://localhost:5173\"]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.cors_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/telemetry-hub.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nport = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TELEMETRY_HUB_HOST", "127.0.0.1"),
            ("TELEMETRY_HUB_PORT", "4000"),
            ("TELEMETRY_HUB_SUBSCRIBER_BUFFER", "32"),
            ("TELEMETRY_HUB_SEND_TIMEOUT_MS", "not-a-number"),
            ("TELEMETRY_HUB_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 4000);
        assert_eq!(config.hub.subscriber_buffer, 32);
        assert_eq!(config.api.send_timeout_ms, 5000);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_is_reported_and_skipped() {
        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "[hub\nsubscriber_buffer = ").unwrap();
        let mut valid = tempfile::NamedTempFile::new().unwrap();
        writeln!(valid, "[hub]\nsubscriber_buffer = 16").unwrap();
        let missing = PathBuf::from("/nonexistent/telemetry-hub/config.toml");

        let paths = [
            missing,
            broken.path().to_path_buf(),
            valid.path().to_path_buf(),
        ];
        let (config, source) = Config::load_first(&paths);

        assert_eq!(config.hub.subscriber_buffer, 16);
        assert_eq!(source.path.as_deref(), Some(valid.path()));
        assert_eq!(source.skipped.len(), 1);
        assert!(matches!(
            &source.skipped[0],
            ConfigError::Parse { path, .. } if path == broken.path()
        ));
    }

    #[test]
    fn test_no_file_falls_back_to_defaults() {
        let (config, source) = Config::load_first(&[PathBuf::from("/nonexistent/config.toml")]);
        assert!(source.path.is_none());
        assert!(source.skipped.is_empty());
        assert_eq!(config.hub.subscriber_buffer, HubConfig::default().subscriber_buffer);
    }
}
