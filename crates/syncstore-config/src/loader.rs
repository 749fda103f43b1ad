use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use crate::{AppConfig, ConfigError};

/// File read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "syncstore.toml";

/// Loads the configuration from `path` (or `syncstore.toml` in the working
/// directory) and environment overrides, then validates it.
///
/// A missing file is not an error: every setting has a default.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
    if pathbuf.exists() {
        builder = builder.add_source(File::from(pathbuf));
    }
    // Environment variable overrides, e.g., SYNCSTORE__STORAGE__READONLY=true
    builder = builder.add_source(
        Environment::with_prefix("SYNCSTORE")
            .try_parsing(true)
            .separator("__"),
    );
    let merged: AppConfig = builder.build()?.try_deserialize()?;
    merged.validate()?;
    tracing::debug!(backend = %merged.storage.backend, "Configuration loaded");
    Ok(merged)
}

pub fn load_config_with_default_path<P: AsRef<Path>>(
    path: Option<P>,
) -> Result<AppConfig, ConfigError> {
    let p = path
        .as_ref()
        .map(|p| p.as_ref().to_string_lossy().to_string());
    load_config(p.as_deref())
}

/// Parses a TOML document without consulting files or the environment.
pub fn load_config_from_str(content: &str) -> Result<AppConfig, ConfigError> {
    let parsed: AppConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_fills_defaults() {
        let cfg = load_config_from_str(
            r#"
[storage]
readonly = true
"#,
        )
        .unwrap();
        assert!(cfg.storage.readonly);
        assert_eq!(cfg.storage.backend, "memory");
        assert_eq!(cfg.heartbeat.read_rate, 0.6);
    }

    #[test]
    fn test_from_str_rejects_invalid_toml() {
        let err = load_config_from_str("[storage\nreadonly = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_str_validates() {
        let err = load_config_from_str("[heartbeat]\nread_rate = -0.1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
