use std::sync::Arc;

use syncstore_config::observability::init_tracing;
use syncstore_config::{AppConfig, ConfigError, HeartbeatSettings, StorageSettings};
use syncstore_storage::{Clock, DynStorage, Heartbeat, Scope, SystemClock};

use crate::InMemoryStorage;

/// Supported storage backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage implemented on top of papaya::HashMap
    Memory,
}

impl StorageBackend {
    pub fn from_name(name: &str) -> Result<Self, FactoryError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(FactoryError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown storage backend '{0}'")]
    UnknownBackend(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Storage and its liveness probe, wired from one configuration.
pub struct Bootstrap {
    pub storage: DynStorage,
    pub heartbeat: Heartbeat,
}

/// Validates `config`, installs tracing at the configured level and builds
/// the storage with its heartbeat.
pub fn bootstrap(config: &AppConfig) -> Result<Bootstrap, FactoryError> {
    config.validate()?;
    if !init_tracing(&config.logging) {
        tracing::debug!("Tracing already initialised, keeping the existing subscriber");
    }
    let storage = create_storage(&config.storage)?;
    let heartbeat = create_heartbeat(storage.clone(), &config.heartbeat);
    Ok(Bootstrap { storage, heartbeat })
}

/// Create a storage instance from the configured settings.
pub fn create_storage(settings: &StorageSettings) -> Result<DynStorage, FactoryError> {
    create_storage_with_clock(settings, Arc::new(SystemClock))
}

/// Like [`create_storage`], stamping writes with `clock`.
pub fn create_storage_with_clock(
    settings: &StorageSettings,
    clock: Arc<dyn Clock>,
) -> Result<DynStorage, FactoryError> {
    match StorageBackend::from_name(&settings.backend)? {
        StorageBackend::Memory => {
            let storage = InMemoryStorage::with_clock(clock)
                .with_max_fetch_size(settings.max_fetch_size)
                .with_readonly(settings.readonly);
            tracing::info!(
                backend = "memory",
                readonly = settings.readonly,
                max_fetch_size = settings.max_fetch_size,
                "Storage backend created"
            );
            Ok(Arc::new(storage))
        }
    }
}

/// Builds the liveness prober for `storage`.
pub fn create_heartbeat(storage: DynStorage, settings: &HeartbeatSettings) -> Heartbeat {
    Heartbeat::new(storage)
        .with_read_rate(settings.read_rate)
        .with_scope(Scope::new(&settings.resource_name, &settings.parent_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!(StorageBackend::from_name("memory").unwrap(), StorageBackend::Memory);
        assert_eq!(StorageBackend::from_name(" Memory ").unwrap(), StorageBackend::Memory);
        assert!(matches!(
            StorageBackend::from_name("postgres"),
            Err(FactoryError::UnknownBackend(name)) if name == "postgres"
        ));
    }

    #[tokio::test]
    async fn test_create_storage_applies_settings() {
        let settings = StorageSettings {
            readonly: true,
            ..StorageSettings::default()
        };
        let storage = create_storage(&settings).unwrap();
        assert!(storage.readonly());
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_bootstrap_wires_storage_and_heartbeat() {
        let mut config = AppConfig::default();
        config.storage.max_fetch_size = 2;
        config.logging.level = "debug".into();

        let Bootstrap { storage, heartbeat } = bootstrap(&config).unwrap();
        assert_eq!(storage.backend_name(), "memory");
        assert!(heartbeat.ping().await);

        config.logging.level = "loud".into();
        assert!(matches!(bootstrap(&config), Err(FactoryError::Config(_))));

        config.logging.level = "info".into();
        config.storage.backend = "postgres".into();
        assert!(matches!(
            bootstrap(&config),
            Err(FactoryError::UnknownBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_heartbeat_uses_configured_scope() {
        let storage = create_storage(&StorageSettings::default()).unwrap();
        let settings = HeartbeatSettings {
            resource_name: "probe".into(),
            parent_id: "probes".into(),
            ..HeartbeatSettings::default()
        };
        let heartbeat = create_heartbeat(storage, &settings);
        assert_eq!(heartbeat.scope(), &Scope::new("probe", "probes"));
        assert!(heartbeat.ping().await);
    }
}
