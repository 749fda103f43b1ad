//! Liveness probe against a storage backend.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, warn};

use crate::error::StorageError;
use crate::object::Object;
use crate::scope::{Scope, ScopePattern};
use crate::traits::Storage;
use crate::types::{DeleteOptions, Query};

/// Resource name and parent id of the dedicated heartbeat scope.
pub const HEARTBEAT_SCOPE: &str = "__heartbeat__";

/// Probability of taking the read-only branch.
pub const DEFAULT_READ_RATE: f64 = 0.6;

/// Random draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Draws from `fastrand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastRandSource;

impl RandomSource for FastRandSource {
    fn next_f64(&self) -> f64 {
        fastrand::f64()
    }
}

/// Always returns the same draw.
#[derive(Debug)]
pub struct FixedRandom(AtomicU64);

impl FixedRandom {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

/// Probes a backend with either a read or a write-then-delete round trip.
///
/// Neither branch leaves anything behind in the heartbeat scope, and
/// failures are logged and reported as `false` rather than propagated.
pub struct Heartbeat {
    storage: Arc<dyn Storage>,
    random: Arc<dyn RandomSource>,
    read_rate: f64,
    scope: Scope,
}

impl fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heartbeat")
            .field("backend", &self.storage.backend_name())
            .field("read_rate", &self.read_rate)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Heartbeat {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            random: Arc::new(FastRandSource),
            read_rate: DEFAULT_READ_RATE,
            scope: Scope::new(HEARTBEAT_SCOPE, HEARTBEAT_SCOPE),
        }
    }

    /// Draws below `read_rate` take the read branch.
    #[must_use]
    pub fn with_read_rate(mut self, read_rate: f64) -> Self {
        self.read_rate = read_rate.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Runs one probe. Returns `true` when the backend answered correctly.
    pub async fn ping(&self) -> bool {
        let read = self.storage.readonly() || self.random.next_f64() < self.read_rate;
        let result = if read {
            self.read_probe().await
        } else {
            self.write_probe().await
        };

        match result {
            Ok(()) => {
                debug!(backend = self.storage.backend_name(), read, "Heartbeat succeeded");
                true
            }
            Err(err) => {
                error!(
                    backend = self.storage.backend_name(),
                    error = %err,
                    category = %err.category(),
                    "Heartbeat error"
                );
                if !read {
                    self.cleanup().await;
                }
                false
            }
        }
    }

    async fn read_probe(&self) -> Result<(), StorageError> {
        let pattern = ScopePattern::from(&self.scope);
        self.storage
            .get_all(&pattern, &Query::new().with_limit(1))
            .await
            .map(|_| ())
    }

    async fn write_probe(&self) -> Result<(), StorageError> {
        let marker: Object = [(HEARTBEAT_SCOPE, true)].into_iter().collect();
        let created = self.storage.create(&self.scope, &marker, None).await?;
        let id = created
            .id()
            .ok_or_else(|| StorageError::invalid_object("heartbeat marker has no id"))?;
        self.storage
            .delete(&self.scope, id, DeleteOptions::new().without_tombstone())
            .await?;
        Ok(())
    }

    /// Best effort removal of anything a failed write probe left behind.
    async fn cleanup(&self) {
        let pattern = ScopePattern::from(&self.scope);
        if let Err(err) = self.storage.delete_all(&pattern, &Query::new(), false).await {
            warn!(error = %err, "Heartbeat cleanup could not delete markers");
        }
        if let Err(err) = self.storage.purge_deleted(&pattern, None, None).await {
            warn!(error = %err, "Heartbeat cleanup could not purge tombstones");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_random() {
        let random = FixedRandom::new(0.7);
        assert_eq!(random.next_f64(), 0.7);
        random.set(0.5);
        assert_eq!(random.next_f64(), 0.5);
    }

    #[test]
    fn test_fastrand_draws_unit_interval() {
        for _ in 0..100 {
            let draw = FastRandSource.next_f64();
            assert!((0.0..1.0).contains(&draw));
        }
    }
}
