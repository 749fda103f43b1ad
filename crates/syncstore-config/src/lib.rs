//! Typed configuration for syncstore services.
//!
//! Settings come from an optional TOML file overlaid by `SYNCSTORE__*`
//! environment variables, see [`loader::load_config`].

use serde::{Deserialize, Serialize};

pub mod loader;
pub mod observability;

pub use loader::{load_config, load_config_from_str};

/// Resource name and parent id of the default heartbeat scope.
pub const DEFAULT_HEARTBEAT_SCOPE: &str = "__heartbeat__";

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Storage validations
        if self.storage.backend.trim().is_empty() {
            return Err(ConfigError::validation("storage.backend must not be empty"));
        }
        if self.storage.max_fetch_size == 0 {
            return Err(ConfigError::validation("storage.max_fetch_size must be > 0"));
        }
        // Heartbeat validations
        if !(0.0..=1.0).contains(&self.heartbeat.read_rate) {
            return Err(ConfigError::validation(
                "heartbeat.read_rate must be within [0, 1]",
            ));
        }
        if self.heartbeat.resource_name.is_empty() || self.heartbeat.parent_id.is_empty() {
            return Err(ConfigError::validation(
                "heartbeat.resource_name and heartbeat.parent_id must not be empty",
            ));
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

/// Storage backend selection and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Backend name. Only `memory` ships today.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Refuse to establish timestamps for unseen scopes.
    #[serde(default)]
    pub readonly: bool,
    /// Cap on objects returned by a single `get_all`.
    #[serde(default = "default_max_fetch_size")]
    pub max_fetch_size: usize,
}

fn default_backend() -> String {
    "memory".into()
}

fn default_max_fetch_size() -> usize {
    10_000
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            readonly: false,
            max_fetch_size: default_max_fetch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatSettings {
    /// Probability of a read-only probe.
    #[serde(default = "default_read_rate")]
    pub read_rate: f64,
    #[serde(default = "default_heartbeat_scope")]
    pub resource_name: String,
    #[serde(default = "default_heartbeat_scope")]
    pub parent_id: String,
}

fn default_read_rate() -> f64 {
    0.6
}

fn default_heartbeat_scope() -> String {
    DEFAULT_HEARTBEAT_SCOPE.into()
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            read_rate: default_read_rate(),
            resource_name: default_heartbeat_scope(),
            parent_id: default_heartbeat_scope(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.storage.backend, "memory");
        assert_eq!(cfg.storage.max_fetch_size, 10_000);
        assert!(!cfg.storage.readonly);
        assert_eq!(cfg.heartbeat.read_rate, 0.6);
        assert_eq!(cfg.heartbeat.resource_name, "__heartbeat__");
        assert_eq!(cfg.logging.level, "info");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.storage.max_fetch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.heartbeat.read_rate = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.heartbeat.parent_id.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "DEBUG".into();
        cfg.validate().unwrap();
    }
}
