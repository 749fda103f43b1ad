//! Scope timestamp rules.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use super::{ConformanceHarness, Fixture, object};
use crate::object::MODIFIED_FIELD;
use crate::scope::Scope;
use crate::timestamp::{Clock, SystemClock};
use crate::traits::Storage;
use crate::types::DeleteOptions;

const OBJECT_ID: &str = "472be9ec-26fe-461b-8282-9c4e4b207ab3";

pub async fn timestamps_are_incremented_on_create<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    let before = fx.timestamp().await;
    fx.create(json!({})).await;
    assert!(before < fx.timestamp().await);
}

pub async fn timestamps_are_incremented_on_update<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({})).await;
    let before = fx.timestamp().await;
    fx.storage
        .update(&fx.scope, stored.id().unwrap(), &object(json!({"bar": "foo"})))
        .await
        .unwrap();
    assert!(before < fx.timestamp().await);
}

pub async fn timestamps_are_incremented_on_delete<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({})).await;
    let before = fx.timestamp().await;
    fx.delete(stored.id().unwrap()).await;
    assert!(before < fx.timestamp().await);

    // Deleting without a tombstone still counts as a write.
    let stored = fx.create(json!({})).await;
    let before = fx.timestamp().await;
    fx.storage
        .delete(&fx.scope, stored.id().unwrap(), DeleteOptions::new().without_tombstone())
        .await
        .unwrap();
    assert!(before < fx.timestamp().await);
}

pub async fn timestamps_are_unique_under_concurrent_writes<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let writers: Vec<_> = (0..4)
        .map(|_| {
            let storage = fx.storage.clone();
            let scope = fx.scope.clone();
            tokio::spawn(async move {
                let mut stamps = Vec::with_capacity(50);
                for _ in 0..50 {
                    let created = storage
                        .create(&scope, &object(json!({"concurrent": true})), None)
                        .await
                        .expect("concurrent create");
                    stamps.push(created.last_modified().expect("stamped"));
                }
                stamps
            })
        })
        .collect();

    let mut obtained = Vec::new();
    for writer in writers {
        obtained.extend(writer.await.expect("writer task"));
    }
    assert_eq!(obtained.len(), 200);
    let unique: HashSet<_> = obtained.iter().collect();
    assert_eq!(unique.len(), obtained.len(), "duplicated timestamps");
}

pub async fn timestamp_is_stable_while_scope_remains_empty<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let first = fx.timestamp().await;
    fx.clock.advance(2);
    let second = fx.timestamp().await;
    assert_eq!(first, second);
}

pub async fn timestamps_are_based_on_real_time_milliseconds<H: ConformanceHarness>(harness: &H) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = harness.backend(clock.clone()).await;
    let scope = Scope::new("test", "1234");

    let before = clock.now_millis();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let created = storage
        .create(&scope, &object(json!({})), None)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let after = clock.now_millis();

    let now = created.last_modified().unwrap();
    assert!(before < now && now < after, "{before} < {now} < {after}");
}

pub async fn timestamps_are_always_incremented_above_existing_value<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let current = fx.create(json!({})).await.last_modified().unwrap();

    // A clock before the big bang.
    fx.clock.set(-1);
    let after = fx.create(json!({})).await.last_modified().unwrap();
    assert!(0 < current && current < after, "0 < {current} < {after}");
}

pub async fn resource_timestamp_fails_when_empty_and_readonly<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    harness.set_readonly(&fx.storage, true);
    let err = fx
        .storage
        .resource_timestamp(&Scope::new("will-be-empty", "1234"))
        .await
        .unwrap_err();
    assert!(err.is_backend(), "{err:?}");
    harness.set_readonly(&fx.storage, false);
}

pub async fn resource_timestamp_returns_current_while_readonly<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let scope = Scope::new("will-be-empty", "1234");
    let first = fx.timestamp_of(&scope).await;
    harness.set_readonly(&fx.storage, true);
    fx.clock.advance(100);
    let second = fx.timestamp_of(&scope).await;
    assert_eq!(first, second);
    harness.set_readonly(&fx.storage, false);
}

pub async fn create_uses_specified_last_modified_if_scope_empty<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let last_modified = 1_448_881_675_541;
    fx.create(json!({"id": OBJECT_ID, MODIFIED_FIELD: last_modified}))
        .await;

    let retrieved = fx.storage.get(&fx.scope, OBJECT_ID).await.unwrap();
    assert_eq!(retrieved.last_modified(), Some(last_modified));
    assert_eq!(fx.timestamp().await, last_modified);
}

pub async fn create_ignores_specified_last_modified_if_in_the_past<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let before = fx.create(json!({})).await.last_modified().unwrap();

    fx.create(json!({"id": OBJECT_ID, MODIFIED_FIELD: before - 10}))
        .await;

    let retrieved = fx.storage.get(&fx.scope, OBJECT_ID).await.unwrap();
    let stamped = retrieved.last_modified().unwrap();
    assert!(stamped > before);
    assert_eq!(fx.timestamp().await, stamped);
}

pub async fn create_ignores_specified_last_modified_if_equal<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let before = fx.create(json!({})).await.last_modified().unwrap();

    fx.create(json!({"id": OBJECT_ID, MODIFIED_FIELD: before}))
        .await;

    let retrieved = fx.storage.get(&fx.scope, OBJECT_ID).await.unwrap();
    assert!(retrieved.last_modified().unwrap() > before);
    assert!(fx.timestamp().await > before);
}

pub async fn update_uses_specified_last_modified_if_in_future<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let mut stored = fx.create(json!({})).await;
    let id = stored.id().unwrap().to_string();
    let before = stored.last_modified().unwrap();

    stored.set_last_modified(before + 10);
    fx.storage.update(&fx.scope, &id, &stored).await.unwrap();

    let retrieved = fx.storage.get(&fx.scope, &id).await.unwrap();
    assert_eq!(retrieved.last_modified(), Some(before + 10));
    assert_eq!(fx.timestamp().await, before + 10);
}

pub async fn update_ignores_specified_last_modified_if_in_the_past<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let mut stored = fx.create(json!({})).await;
    let id = stored.id().unwrap().to_string();
    let before = fx.timestamp().await;

    stored.set_last_modified(before - 10);
    fx.storage.update(&fx.scope, &id, &stored).await.unwrap();

    let retrieved = fx.storage.get(&fx.scope, &id).await.unwrap();
    assert!(retrieved.last_modified().unwrap() > before);
    assert_eq!(fx.timestamp().await, retrieved.last_modified().unwrap());
}

pub async fn update_ignores_specified_last_modified_if_equal<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({})).await;
    let id = stored.id().unwrap();
    let before = stored.last_modified().unwrap();

    fx.storage.update(&fx.scope, id, &stored).await.unwrap();

    let retrieved = fx.storage.get(&fx.scope, id).await.unwrap();
    assert!(retrieved.last_modified().unwrap() > before);
    assert!(fx.timestamp().await > before);
}
