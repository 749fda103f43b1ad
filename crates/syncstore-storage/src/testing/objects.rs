//! Single-object operations, backend errors and scope isolation.

use std::error::Error as _;

use serde_json::json;

use super::{ConformanceHarness, Fixture, object};
use crate::error::StorageError;
use crate::id::IdGenerator;
use crate::object::{MODIFIED_FIELD, Object};
use crate::scope::{Scope, ScopePattern};
use crate::traits::Storage;
use crate::types::{DeleteOptions, Query};
use crate::value::Value;

pub async fn raises_backend_error_if_client_fails<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let id = stored.id().unwrap_or_default().to_string();
    harness.break_client(&fx.storage, true);

    let storage = &fx.storage;
    let scope = &fx.scope;
    let pattern = fx.pattern();
    let body = object(json!({"foo": "baz"}));

    assert!(storage.create(scope, &body, None).await.unwrap_err().is_backend());
    assert!(storage.get(scope, &id).await.unwrap_err().is_backend());
    assert!(storage.update(scope, &id, &body).await.unwrap_err().is_backend());
    assert!(
        storage
            .delete(scope, &id, DeleteOptions::new())
            .await
            .unwrap_err()
            .is_backend()
    );
    assert!(storage.get_all(&pattern, &Query::new()).await.unwrap_err().is_backend());
    assert!(storage.count_all(&pattern, &[]).await.unwrap_err().is_backend());
    assert!(
        storage
            .delete_all(&pattern, &Query::new(), true)
            .await
            .unwrap_err()
            .is_backend()
    );
    assert!(
        storage
            .purge_deleted(&pattern, None, None)
            .await
            .unwrap_err()
            .is_backend()
    );
    assert!(storage.resource_timestamp(scope).await.unwrap_err().is_backend());
    assert!(storage.flush().await.unwrap_err().is_backend());

    harness.break_client(&fx.storage, false);
    assert_eq!(storage.get(scope, &id).await.unwrap(), stored);
}

pub async fn backend_error_provides_original_failure<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    harness.break_client(&fx.storage, true);

    let err = fx
        .storage
        .create(&fx.scope, &object(json!({})), None)
        .await
        .unwrap_err();
    let StorageError::Backend(backend) = &err else {
        panic!("expected a backend error, got {err:?}");
    };
    assert!(!backend.original().to_string().is_empty());
    assert!(err.source().is_some());
}

pub async fn initialize_schema_is_idempotent<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.storage.initialize_schema().await.unwrap();
    let stored = fx.create(json!({"foo": "bar"})).await;
    fx.storage.initialize_schema().await.unwrap();
    assert_eq!(fx.storage.get(&fx.scope, stored.id().unwrap()).await.unwrap(), stored);
}

pub async fn flush_removes_everything<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"foo": "bar"})).await;
    fx.create_and_delete(json!({"foo": "baz"})).await;
    fx.create_in(&fx.other_scope, json!({"foo": "qux"})).await;

    fx.storage.flush().await.unwrap();

    let everything = ScopePattern::any_resource("*");
    let result = fx.get_all_in(&everything, Query::new().including_deleted()).await;
    assert!(result.objects.is_empty());
    assert_eq!(result.total, 0);
}

pub async fn reports_backend_name<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    assert!(!fx.storage.backend_name().is_empty());
    assert!(!fx.storage.readonly());
}

pub async fn create_adds_the_object_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    assert!(stored.id().is_some_and(|id| !id.is_empty()));
}

pub async fn create_works_as_expected<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let before = fx.timestamp().await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let retrieved = fx.storage.get(&fx.scope, stored.id().unwrap()).await.unwrap();

    assert_eq!(retrieved, stored);
    assert_eq!(retrieved.get("foo"), Some(&Value::from("bar")));
    assert!(retrieved.last_modified().unwrap() > before);
}

pub async fn create_copies_the_object_before_modifying_it<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let body = object(json!({"foo": "bar"}));
    fx.storage.create(&fx.scope, &body, None).await.unwrap();
    assert_eq!(body.id(), None);
    assert_eq!(body.last_modified(), None);
}

pub async fn create_uses_the_id_generator<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let generator = || "generated-id".to_string();
    let stored = fx
        .storage
        .create(&fx.scope, &object(json!({"foo": "bar"})), Some(&generator as &dyn IdGenerator))
        .await
        .unwrap();
    assert_eq!(stored.id(), Some("generated-id"));
}

pub async fn create_supports_unicode_for_parent_and_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let scope = Scope::new("test", "Rémy");
    let stored = fx.create_in(&scope, json!({"id": "Rémy"})).await;
    assert_eq!(stored.id(), Some("Rémy"));
    assert_eq!(fx.storage.get(&scope, "Rémy").await.unwrap(), stored);
}

pub async fn create_does_not_overwrite_the_provided_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let generator = || "generated-id".to_string();
    let stored = fx
        .storage
        .create(&fx.scope, &object(json!({"id": "my-id"})), Some(&generator as &dyn IdGenerator))
        .await
        .unwrap();
    assert_eq!(stored.id(), Some("my-id"));
}

pub async fn create_raises_unicity_error_if_provided_id_exists<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"id": "X", "foo": "bar"})).await;
    let err = fx
        .storage
        .create(&fx.scope, &object(json!({"id": "X", "foo": "baz"})), None)
        .await
        .unwrap_err();
    assert!(err.is_unicity(), "{err:?}");

    // Same id in another scope is fine.
    fx.create_in(&fx.other_scope, json!({"id": "X"})).await;
}

pub async fn create_generates_a_new_last_modified_field<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let second = fx.create(json!({"foo": "bar"})).await;
    assert!(stored.last_modified().is_some());
    assert!(second.last_modified() > stored.last_modified());
}

pub async fn get_raises_on_object_not_found<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let err = fx.storage.get(&fx.scope, "1234").await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

pub async fn update_creates_a_new_object_when_needed<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    assert!(fx.storage.get(&fx.scope, "new").await.is_err());

    let stored = fx
        .storage
        .update(&fx.scope, "new", &object(json!({"foo": "bar"})))
        .await
        .unwrap();
    assert_eq!(stored.id(), Some("new"));
    assert_eq!(fx.storage.get(&fx.scope, "new").await.unwrap(), stored);
}

pub async fn update_overwrites_object_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let id = stored.id().unwrap();

    let updated = fx
        .storage
        .update(&fx.scope, id, &object(json!({"id": "this-will-be-ignored", "foo": "baz"})))
        .await
        .unwrap();
    assert_eq!(updated.id(), Some(id));
    assert_eq!(updated.get("foo"), Some(&Value::from("baz")));
    assert!(fx.storage.get(&fx.scope, "this-will-be-ignored").await.is_err());
}

pub async fn update_generates_a_new_last_modified_field_if_not_present<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let mut body = stored.clone();
    body.remove(MODIFIED_FIELD);

    let updated = fx
        .storage
        .update(&fx.scope, stored.id().unwrap(), &body)
        .await
        .unwrap();
    assert!(updated.last_modified() > stored.last_modified());
}

pub async fn delete_works_properly<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let id = stored.id().unwrap();

    let tombstone = fx.delete(id).await;
    assert_eq!(tombstone.id(), Some(id));
    assert!(tombstone.is_deleted());
    assert!(fx.storage.get(&fx.scope, id).await.unwrap_err().is_not_found());
}

pub async fn delete_can_specify_the_last_modified<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let requested = stored.last_modified().unwrap() + 10;

    let tombstone = fx
        .storage
        .delete(
            &fx.scope,
            stored.id().unwrap(),
            DeleteOptions::new().with_last_modified(requested),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tombstone.last_modified(), Some(requested));
    assert_eq!(fx.timestamp().await, requested);
}

pub async fn delete_raises_when_unknown<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let err = fx
        .storage
        .delete(&fx.scope, "1234", DeleteOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

fn bytes_body() -> Object {
    let mut body = object(json!({"flavor": "steak"}));
    body.insert("steak", Value::Bytes("haché".as_bytes().to_vec()));
    body
}

pub async fn create_bytes_raises<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let err = fx
        .storage
        .create(&fx.scope, &bytes_body(), None)
        .await
        .unwrap_err();
    assert!(err.is_unsupported_value(), "{err:?}");
    assert_eq!(fx.get_all(Query::new()).await.total, 0);
}

pub async fn update_bytes_raises<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"flavor": "mint"})).await;
    let id = stored.id().unwrap();

    let err = fx.storage.update(&fx.scope, id, &bytes_body()).await.unwrap_err();
    assert!(err.is_unsupported_value(), "{err:?}");
    assert_eq!(fx.storage.get(&fx.scope, id).await.unwrap(), stored);
}

pub async fn parent_cannot_access_other_parent_object<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let err = fx
        .storage
        .get(&fx.other_scope, stored.id().unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

pub async fn parent_cannot_delete_other_parent_object<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let err = fx
        .storage
        .delete(&fx.other_scope, stored.id().unwrap(), DeleteOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(fx.storage.get(&fx.scope, stored.id().unwrap()).await.is_ok());
}

pub async fn parent_cannot_update_other_parent_object<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let stored = fx.create(json!({"foo": "bar"})).await;
    let id = stored.id().unwrap();

    fx.storage
        .update(&fx.other_scope, id, &object(json!({"another": "object"})))
        .await
        .unwrap();
    let not_updated = fx.storage.get(&fx.scope, id).await.unwrap();
    assert!(!not_updated.contains_key("another"));
}
