//! Monitor configuration: listener, server, storage, registry, analytics
//!
//! Every section implements `Default` from [`super::defaults`], so an empty or
//! partial TOML file is always valid input.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$DALI_MONITOR_CONFIG` env var
/// 2. `./dali_monitor.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// UDP telemetry listener
    #[serde(default)]
    pub listener: ListenerConfig,

    /// HTTP API server
    #[serde(default)]
    pub server: ServerConfig,

    /// Sample store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Gear inventory
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Analytics windows and calendar
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that fails to parse is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every section, collecting all problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.listener.bind_addr().is_err() {
            errors.push(format!("listener.bind: '{}' is not a socket address", self.listener.bind));
        }
        if self.server.bind_addr().is_err() {
            errors.push(format!("server.addr: '{}' is not a socket address", self.server.addr));
        }
        if self.storage.backend == StorageBackend::Sled && self.storage.path.as_os_str().is_empty() {
            errors.push("storage.path: required for the sled backend".to_string());
        }

        let a = &self.analytics;
        if a.utc_offset_minutes.abs() > defaults::MAX_UTC_OFFSET_MINUTES {
            errors.push(format!(
                "analytics.utc_offset_minutes: {} is outside ±{}",
                a.utc_offset_minutes,
                defaults::MAX_UTC_OFFSET_MINUTES
            ));
        }
        for (name, hours) in [
            ("minute_history_hours", a.minute_history_hours),
            ("hour_history_hours", a.hour_history_hours),
            ("error_context_hours", a.error_context_hours),
        ] {
            if hours <= 0 {
                errors.push(format!("analytics.{name}: must be > 0 (got {hours})"));
            } else if hours > defaults::MAX_WINDOW_HOURS {
                errors.push(format!(
                    "analytics.{name}: {hours} exceeds {} hours",
                    defaults::MAX_WINDOW_HOURS
                ));
            }
        }
        if a.fault_window_months == 0 {
            errors.push("analytics.fault_window_months: must be > 0".to_string());
        }
        if a.raw_sample_limit == 0 {
            errors.push("analytics.raw_sample_limit: must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({path}): {err}", path = .0.display(), err = .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({path}): {err}", path = .0.display(), err = .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

/// UDP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Bind address. Overridden by `--udp-bind`.
    #[serde(default = "default_udp_bind")]
    pub bind: String,

    /// Socket receive buffer (bytes); 0 keeps the OS default.
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer_bytes: usize,
}

fn default_udp_bind() -> String {
    defaults::UDP_BIND_ADDR.to_string()
}
fn default_recv_buffer() -> usize {
    defaults::UDP_RECV_BUFFER_BYTES
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: default_udp_bind(),
            recv_buffer_bytes: default_recv_buffer(),
        }
    }
}

impl ListenerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind.parse()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Overridden by `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::HTTP_BIND_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr.parse()
    }
}

/// Sample store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Sled database directory
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(defaults::STORAGE_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// TOML inventory export; a missing file starts an empty registry.
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(defaults::REGISTRY_PATH)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

/// Calendar and query windows of the analytics views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub utc_offset_minutes: i32,
    pub minute_history_hours: i64,
    pub hour_history_hours: i64,
    pub fault_window_months: u32,
    pub error_context_hours: i64,
    pub raw_sample_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: defaults::UTC_OFFSET_MINUTES,
            minute_history_hours: defaults::MINUTE_HISTORY_HOURS,
            hour_history_hours: defaults::HOUR_HISTORY_HOURS,
            fault_window_months: defaults::FAULT_WINDOW_MONTHS,
            error_context_hours: defaults::ERROR_CONTEXT_HOURS,
            raw_sample_limit: defaults::RAW_SAMPLE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: MonitorConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.listener.bind_addr().unwrap().port(), 6666);
        assert_eq!(config.server.bind_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[storage]
backend = "memory"

[analytics]
utc_offset_minutes = 480
"#;
        let config: MonitorConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.analytics.utc_offset_minutes, 480);
        // Untouched values keep their defaults
        assert_eq!(config.analytics.minute_history_hours, 3);
        assert_eq!(config.listener.bind, "0.0.0.0:6666");
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = MonitorConfig::default();
        config.listener.bind = "not-an-address".to_string();
        config.analytics.utc_offset_minutes = 1_440;
        config.analytics.raw_sample_limit = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| e.contains("listener.bind")));
                assert!(errors.iter().any(|e| e.contains("utc_offset_minutes")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_windows_are_rejected() {
        let mut config = MonitorConfig::default();
        config.analytics.minute_history_hours = i64::MAX;
        config.analytics.error_context_hours = defaults::MAX_WINDOW_HOURS + 1;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.contains("minute_history_hours")));
                assert!(errors.iter().any(|e| e.contains("error_context_hours")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }

        config.analytics.minute_history_hours = defaults::MAX_WINDOW_HOURS;
        config.analytics.error_context_hours = defaults::MAX_WINDOW_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut original = MonitorConfig::default();
        original.analytics.fault_window_months = 3;
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: MonitorConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_load_from_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dali_monitor.toml");
        std::fs::write(&path, "[listener\nbind = 1").unwrap();
        assert!(matches!(MonitorConfig::load_from_file(&path), Err(ConfigError::Parse(..))));
    }
}
