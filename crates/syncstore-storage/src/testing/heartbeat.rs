//! Liveness probe behaviour.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::instrument::WithSubscriber;

use super::{ConformanceHarness, Fixture};
use crate::heartbeat::{FixedRandom, HEARTBEAT_SCOPE, Heartbeat};
use crate::scope::ScopePattern;
use crate::traits::Storage;
use crate::types::Query;

/// Draw that selects the write branch under the default read rate.
const WRITE_DRAW: f64 = 0.7;
/// Draw that selects the read branch under the default read rate.
const READ_DRAW: f64 = 0.5;

/// Formatted log output shared with a `tracing-subscriber` writer.
#[derive(Debug, Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn heartbeat<B: Storage + 'static>(fx: &Fixture<B>, draw: f64) -> Heartbeat {
    let storage: Arc<dyn Storage> = fx.storage.clone();
    Heartbeat::new(storage).with_random(Arc::new(FixedRandom::new(draw)))
}

pub async fn ping_returns_true_when_working<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    assert!(heartbeat(&fx, READ_DRAW).ping().await);
    assert!(heartbeat(&fx, WRITE_DRAW).ping().await);
}

pub async fn ping_returns_true_when_working_in_readonly_mode<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    harness.set_readonly(&fx.storage, true);
    // Read-only backends never take the write branch.
    assert!(heartbeat(&fx, WRITE_DRAW).ping().await);
    harness.set_readonly(&fx.storage, false);
}

pub async fn ping_returns_false_if_unavailable<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    harness.break_client(&fx.storage, true);
    assert!(!heartbeat(&fx, READ_DRAW).ping().await);
    assert!(!heartbeat(&fx, WRITE_DRAW).ping().await);
    harness.break_client(&fx.storage, false);
}

pub async fn ping_logs_error_if_unavailable<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::ERROR)
        .finish();

    harness.break_client(&fx.storage, true);
    let alive = heartbeat(&fx, READ_DRAW)
        .ping()
        .with_subscriber(subscriber)
        .await;
    harness.break_client(&fx.storage, false);

    assert!(!alive);
    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("Heartbeat error"), "{output}");
}

pub async fn ping_returns_false_if_unavailable_in_readonly_mode<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    harness.set_readonly(&fx.storage, true);
    harness.break_client(&fx.storage, true);
    assert!(!heartbeat(&fx, WRITE_DRAW).ping().await);
    harness.break_client(&fx.storage, false);
    harness.set_readonly(&fx.storage, false);
}

pub async fn ping_leaves_no_tombstone<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let probe = heartbeat(&fx, WRITE_DRAW);
    for _ in 0..3 {
        assert!(probe.ping().await);
    }

    let pattern = ScopePattern::new(HEARTBEAT_SCOPE, HEARTBEAT_SCOPE);
    let result = fx.get_all_in(&pattern, Query::new().including_deleted()).await;
    assert!(result.objects.is_empty());
    assert_eq!(probe.scope().resource_name, HEARTBEAT_SCOPE);
}
