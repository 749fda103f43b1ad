//! Process-wide tracing setup driven by [`LoggingConfig`].

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::LoggingConfig;

/// Filter for the configured level. A `RUST_LOG` directive takes precedence.
pub fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_ascii_lowercase()))
}

/// Installs the global fmt subscriber.
///
/// Returns `false` when a global subscriber was already installed; that one
/// stays in place.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_keeps_first_subscriber() {
        let logging = LoggingConfig {
            level: "WARN".into(),
        };
        init_tracing(&logging);
        assert!(!init_tracing(&LoggingConfig::default()));
        tracing::warn!("logging after init");
    }
}
