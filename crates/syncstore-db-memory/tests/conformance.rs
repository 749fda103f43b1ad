//! Runs the shared backend conformance suite against the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use syncstore_db_memory::InMemoryStorage;
use syncstore_storage::Clock;
use syncstore_storage::testing::ConformanceHarness;

#[derive(Debug, Default)]
struct MemoryHarness;

#[async_trait]
impl ConformanceHarness for MemoryHarness {
    type Backend = InMemoryStorage;

    async fn backend(&self, clock: Arc<dyn Clock>) -> Arc<InMemoryStorage> {
        Arc::new(InMemoryStorage::with_clock(clock))
    }

    fn set_readonly(&self, backend: &InMemoryStorage, readonly: bool) {
        backend.set_readonly(readonly);
    }

    fn break_client(&self, backend: &InMemoryStorage, broken: bool) {
        backend.set_unavailable(broken);
    }
}

syncstore_storage::storage_conformance_tests!(MemoryHarness);
