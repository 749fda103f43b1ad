//! Tombstones, bulk deletion and purging.

use serde_json::json;

use super::{ConformanceHarness, Fixture, ids};
use crate::error::StorageError;
use crate::filter::{Comparison, Filter};
use crate::object::{DELETED_FIELD, MODIFIED_FIELD, Object};
use crate::scope::{Scope, ScopePattern};
use crate::sort::Sort;
use crate::timestamp::Clock;
use crate::traits::Storage;
use crate::types::{DeleteOptions, Query};
use crate::value::Value;

const OBJECT_ID: &str = "2b7a5b9e-0d8f-4c61-9d63-2c8a4d6a61f0";

fn deleted_flags(objects: &[Object]) -> Vec<bool> {
    objects.iter().map(Object::is_deleted).collect()
}

fn tombstones(objects: &[Object]) -> usize {
    objects.iter().filter(|o| o.is_deleted()).count()
}

pub async fn get_does_not_return_deleted_items<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let tombstone = fx.create_and_delete(json!({"foo": "bar"})).await;
    let err = fx
        .storage
        .get(&fx.scope, tombstone.id().unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

pub async fn deleting_a_deleted_item_raises_not_found<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let tombstone = fx.create_and_delete(json!({"foo": "bar"})).await;
    let err = fx
        .storage
        .delete(&fx.scope, tombstone.id().unwrap(), DeleteOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

pub async fn recreating_a_deleted_object_removes_its_tombstone<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create_and_delete(json!({"id": OBJECT_ID, "foo": "bar"}))
        .await;
    fx.create(json!({"id": OBJECT_ID, "foo": "baz"})).await;

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(tombstones(&result.objects), 0);
    assert_eq!(result.objects[0].id(), Some(OBJECT_ID));
    assert_eq!(result.objects[0].get("foo"), Some(&Value::from("baz")));
}

pub async fn deleting_an_object_twice_updates_its_tombstone<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let first = fx.create_and_delete(json!({"id": OBJECT_ID})).await;
    let second = fx.create_and_delete(json!({"id": OBJECT_ID})).await;
    assert!(second.last_modified() > first.last_modified());

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects, vec![second]);
}

pub async fn deleted_items_have_only_basic_fields<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let tombstone = fx
        .create_and_delete(json!({"foo": "bar", "nested": {"secret": 42}}))
        .await;
    assert_eq!(tombstone.len(), 3);
    assert!(tombstone.id().is_some());
    assert!(tombstone.last_modified().is_some());
    assert!(tombstone.is_deleted());

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects, vec![tombstone]);
    assert!(!result.objects[0].contains_key("foo"));
}

pub async fn last_modified_of_a_deleted_item_is_deletion_time<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let created = fx.create(json!({})).await;
    fx.clock.advance(5);
    let tombstone = fx.delete(created.id().unwrap()).await;
    assert!(tombstone.last_modified() > created.last_modified());
    assert_eq!(tombstone.last_modified(), Some(fx.timestamp().await));
}

pub async fn get_all_does_not_include_deleted_items_by_default<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let result = fx.get_all(Query::new()).await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(tombstones(&result.objects), 0);
}

pub async fn get_all_count_does_not_include_deleted_items<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects.len(), 3);
    assert_eq!(result.total, 2);
}

pub async fn get_all_can_return_deleted_items<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let live = fx.create(json!({"foo": "bar"})).await;
    let tombstone = fx.create_and_delete(json!({"foo": "baz"})).await;

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::asc(MODIFIED_FIELD)))
        .await;
    assert_eq!(result.objects, vec![live, tombstone]);
    assert_eq!(deleted_flags(&result.objects), vec![false, true]);
}

pub async fn delete_all_keeps_track_of_deleted_objects<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"foo": 1})).await;
    fx.create(json!({"foo": 2})).await;

    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &Query::new(), true)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(tombstones(&result.objects), 2);
    assert_eq!(result.total, 0);
}

pub async fn delete_all_returns_objects_before_deletion<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let created = fx.create(json!({"foo": "bar"})).await;

    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &Query::new(), true)
        .await
        .unwrap();
    assert_eq!(removed, vec![created]);
    assert!(!removed[0].is_deleted());
}

pub async fn delete_all_can_delete_without_tombstones<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create(json!({})).await;

    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &Query::new(), false)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert!(result.objects.is_empty());
}

pub async fn delete_can_delete_without_tombstones<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let created = fx.create(json!({})).await;

    let outcome = fx
        .storage
        .delete(&fx.scope, created.id().unwrap(), DeleteOptions::new().without_tombstone())
        .await
        .unwrap();
    assert!(outcome.is_none());

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert!(result.objects.is_empty());
}

pub async fn deleting_without_tombstone_raises_not_found<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let created = fx.create(json!({})).await;
    let id = created.id().unwrap();
    let options = DeleteOptions::new().without_tombstone();

    fx.storage.delete(&fx.scope, id, options).await.unwrap();
    let err = fx.storage.delete(&fx.scope, id, options).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

pub async fn delete_all_can_delete_by_parent_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent in ["abc", "abd", "efg"] {
        fx.create_in(&Scope::new("test", parent), json!({})).await;
    }

    let pattern = ScopePattern::new("test", "ab*");
    let removed = fx
        .storage
        .delete_all(&pattern, &Query::new(), false)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let gone = fx
        .get_all_in(&pattern, Query::new().including_deleted())
        .await;
    assert!(gone.objects.is_empty());

    let kept = fx
        .get_all_in(&ScopePattern::new("test", "efg"), Query::new())
        .await;
    assert_eq!(kept.objects.len(), 1);
}

pub async fn delete_all_does_proper_parent_id_matching<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent in ["abc", "xabcx", "abcx"] {
        fx.create_in(&Scope::new("test", parent), json!({})).await;
    }

    let removed = fx
        .storage
        .delete_all(&ScopePattern::new("test", "abc"), &Query::new(), true)
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);

    let remaining = fx
        .get_all_in(&ScopePattern::new("test", "abc*"), Query::new())
        .await;
    assert_eq!(remaining.objects.len(), 1);
    let remaining = fx
        .get_all_in(&ScopePattern::new("test", "*"), Query::new())
        .await;
    assert_eq!(remaining.objects.len(), 2);
}

pub async fn delete_all_can_delete_by_parent_id_with_tombstones<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    for parent in ["abc", "abd", "efg"] {
        fx.create_in(&Scope::new("test", parent), json!({"foo": parent}))
            .await;
    }

    let pattern = ScopePattern::new("test", "ab*");
    fx.storage
        .delete_all(&pattern, &Query::new(), true)
        .await
        .unwrap();

    let result = fx
        .get_all_in(&pattern, Query::new().including_deleted())
        .await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(tombstones(&result.objects), 2);
    assert_eq!(result.total, 0);
}

pub async fn delete_all_can_delete_partially<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for foo in [1, 1, 1, 2, 2] {
        fx.create(json!({"foo": foo})).await;
    }

    let query = Query::new().with_filter(Filter::new("foo", 1, Comparison::Eq));
    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &query, true)
        .await
        .unwrap();
    assert_eq!(removed.len(), 3);

    let result = fx.get_all(Query::new()).await;
    assert_eq!(result.total, 2);
}

pub async fn delete_all_supports_limit<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for foo in 0..5 {
        fx.create(json!({"foo": foo})).await;
    }

    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &Query::new().with_limit(2), true)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let result = fx.get_all(Query::new()).await;
    assert_eq!(result.total, 3);
}

pub async fn delete_all_supports_sorting<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for foo in 0..5 {
        fx.create(json!({"foo": foo})).await;
    }

    let query = Query::new().with_sort(Sort::desc("foo")).with_limit(2);
    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &query, true)
        .await
        .unwrap();
    let removed_foos: Vec<_> = removed.iter().filter_map(|o| o.get("foo")?.as_i64()).collect();
    assert_eq!(removed_foos, vec![4, 3]);

    let result = fx.get_all(Query::new().with_sort(Sort::desc("foo"))).await;
    assert_eq!(result.total, 3);
    assert_eq!(result.objects[0].get("foo").and_then(|v| v.as_i64()), Some(2));
}

pub async fn delete_all_supports_pagination_rules<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for foo in 0..6 {
        fx.create(json!({"foo": foo})).await;
    }

    let query = Query::new()
        .with_pagination_rules(vec![vec![Filter::new("foo", 3, Comparison::Gt)]])
        .with_limit(4);
    let removed = fx
        .storage
        .delete_all(&fx.pattern(), &query, true)
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let result = fx.get_all(Query::new()).await;
    assert_eq!(result.total, 4);
}

pub async fn purge_deleted_removes_all_tombstones<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let purged = fx
        .storage
        .purge_deleted(&fx.pattern(), None, None)
        .await
        .unwrap();
    assert_eq!(purged, 2);

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(tombstones(&result.objects), 0);
}

pub async fn purge_deleted_removes_tombstones_by_parent_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent in ["abc", "abd", "efg"] {
        let scope = Scope::new("test", parent);
        let created = fx.create_in(&scope, json!({})).await;
        fx.storage
            .delete(&scope, created.id().unwrap(), DeleteOptions::new())
            .await
            .unwrap();
    }

    let purged = fx
        .storage
        .purge_deleted(&ScopePattern::new("test", "ab*"), None, None)
        .await
        .unwrap();
    assert_eq!(purged, 2);

    let remaining = fx
        .get_all_in(&ScopePattern::new("test", "*"), Query::new().including_deleted())
        .await;
    assert_eq!(remaining.objects.len(), 1);
    assert!(remaining.objects[0].is_deleted());
}

pub async fn purge_deleted_retires_timestamps_by_parent_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let emptied = Scope::new("test", "abc");
    let populated = Scope::new("test", "abd");

    let created = fx.create_in(&emptied, json!({})).await;
    fx.storage
        .delete(&emptied, created.id().unwrap(), DeleteOptions::new())
        .await
        .unwrap();
    fx.create_in(&populated, json!({})).await;
    let doomed = fx.create_in(&populated, json!({})).await;
    fx.storage
        .delete(&populated, doomed.id().unwrap(), DeleteOptions::new())
        .await
        .unwrap();

    let emptied_before = fx.timestamp_of(&emptied).await;
    let populated_before = fx.timestamp_of(&populated).await;

    fx.clock.advance(1_000);
    fx.storage
        .purge_deleted(&ScopePattern::new("test", "ab*"), None, None)
        .await
        .unwrap();

    let emptied_after = fx.timestamp_of(&emptied).await;
    assert_ne!(emptied_after, emptied_before);
    assert_eq!(emptied_after, fx.clock.now_millis());
    assert_eq!(fx.timestamp_of(&populated).await, populated_before);
}

pub async fn purge_deleted_works_when_no_tombstones<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let purged = fx
        .storage
        .purge_deleted(&fx.pattern(), None, None)
        .await
        .unwrap();
    assert_eq!(purged, 0);

    fx.create(json!({})).await;
    let purged = fx
        .storage
        .purge_deleted(&fx.pattern(), None, None)
        .await
        .unwrap();
    assert_eq!(purged, 0);
    assert_eq!(fx.get_all(Query::new()).await.total, 1);
}

pub async fn purge_deleted_before_is_exclusive<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let mut stamps = Vec::new();
    for _ in 0..3 {
        let tombstone = fx.create_and_delete(json!({})).await;
        stamps.push(tombstone.last_modified().unwrap());
    }

    let purged = fx
        .storage
        .purge_deleted(&fx.pattern(), Some(stamps[1]), None)
        .await
        .unwrap();
    assert_eq!(purged, 1);

    let result = fx.get_all(Query::new().including_deleted()).await;
    let mut remaining: Vec<_> = result.objects.iter().filter_map(Object::last_modified).collect();
    remaining.sort_unstable();
    assert_eq!(remaining, stamps[1..].to_vec());
}

pub async fn purge_deleted_can_retain_newest_tombstones<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let mut newest = None;
    for _ in 0..4 {
        newest = Some(fx.create_and_delete(json!({})).await);
    }
    for _ in 0..2 {
        let created = fx.create_in(&fx.other_scope, json!({})).await;
        fx.storage
            .delete(&fx.other_scope, created.id().unwrap(), DeleteOptions::new())
            .await
            .unwrap();
    }

    let everywhere = ScopePattern::new("test", "*");
    let purged = fx
        .storage
        .purge_deleted(&everywhere, None, Some(1))
        .await
        .unwrap();
    assert_eq!(purged, 4);

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects, newest.into_iter().collect::<Vec<_>>());
    let other = fx
        .get_all_in(&ScopePattern::from(&fx.other_scope), Query::new().including_deleted())
        .await;
    assert_eq!(other.objects.len(), 1);
}

pub async fn purge_deleted_rejects_before_with_max_retained<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let tombstone = fx.create_and_delete(json!({})).await;

    let err = fx
        .storage
        .purge_deleted(&fx.pattern(), tombstone.last_modified(), Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery { .. }), "{err:?}");

    let result = fx.get_all(Query::new().including_deleted()).await;
    assert_eq!(result.objects, vec![tombstone]);
}

pub async fn sorting_on_last_modified_applies_to_deleted_items<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let first = fx.create(json!({})).await;
    let second = fx.create_and_delete(json!({})).await;
    let third = fx.create(json!({})).await;
    let fourth = fx.create_and_delete(json!({})).await;

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::desc(MODIFIED_FIELD)))
        .await;
    assert_eq!(ids(&result.objects), ids(&[fourth, third, second, first]));
    assert_eq!(deleted_flags(&result.objects), vec![true, false, true, false]);
}

pub async fn sorting_on_last_modified_mixes_deleted_objects<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for i in 0..10 {
        if i % 2 == 0 {
            fx.create_and_delete(json!({"rank": i})).await;
        } else {
            fx.create(json!({"rank": i})).await;
        }
    }

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::asc(MODIFIED_FIELD)))
        .await;
    let stamps: Vec<_> = result.objects.iter().filter_map(Object::last_modified).collect();
    assert_eq!(stamps.len(), 10);
    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    let expected: Vec<bool> = (0..10).map(|i| i % 2 == 0).collect();
    assert_eq!(deleted_flags(&result.objects), expected);
}

pub async fn sorting_on_arbitrary_field_groups_deleted_last<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"status": 2})).await;
    fx.create_and_delete(json!({"status": 0})).await;
    fx.create(json!({"status": 1})).await;
    fx.create_and_delete(json!({"status": 3})).await;

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::asc("status")))
        .await;
    assert_eq!(deleted_flags(&result.objects), vec![false, false, true, true]);
    let statuses: Vec<_> = result.objects[..2]
        .iter()
        .filter_map(|o| o.get("status")?.as_i64())
        .collect();
    assert_eq!(statuses, vec![1, 2]);
    // Tombstones fall back to the newest-first tiebreak.
    assert!(result.objects[2].last_modified() > result.objects[3].last_modified());
}

pub async fn sorting_on_deleted_field_groups_deleted_first<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::asc(DELETED_FIELD)))
        .await;
    assert_eq!(deleted_flags(&result.objects), vec![true, true, false, false]);

    let result = fx
        .get_all(Query::new().including_deleted().with_sort(Sort::desc(DELETED_FIELD)))
        .await;
    assert_eq!(deleted_flags(&result.objects), vec![false, false, true, true]);
}

pub async fn filtering_on_last_modified_applies_to_deleted_items<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let first = fx.create(json!({})).await;
    let tombstone = fx.create_and_delete(json!({})).await;
    let live = fx.create(json!({})).await;

    let query = Query::new()
        .including_deleted()
        .with_filter(Filter::new(MODIFIED_FIELD, first.last_modified().unwrap(), Comparison::Gt))
        .with_sort(Sort::asc(MODIFIED_FIELD));
    let result = fx.get_all(query).await;
    assert_eq!(result.objects, vec![tombstone, live]);
    assert_eq!(result.total, 1);
}

pub async fn filtering_on_arbitrary_field_excludes_deleted_objects<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"status": 0})).await;
    fx.create(json!({"status": 0})).await;
    fx.create_and_delete(json!({"status": 0})).await;

    let query = Query::new()
        .including_deleted()
        .with_filter(Filter::new("status", 0, Comparison::Eq));
    let result = fx.get_all(query).await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(tombstones(&result.objects), 0);
    assert_eq!(result.total, 2);
}

pub async fn filtering_on_deleted_field<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let query = Query::new()
        .including_deleted()
        .with_filter(Filter::new(DELETED_FIELD, true, Comparison::Eq));
    let result = fx.get_all(query).await;
    assert_eq!(deleted_flags(&result.objects), vec![true, true]);
    assert_eq!(result.total, 0);
}

pub async fn filtering_out_on_deleted_field<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let query = Query::new()
        .including_deleted()
        .with_filter(Filter::new(DELETED_FIELD, true, Comparison::Not));
    let result = fx.get_all(query).await;
    assert_eq!(deleted_flags(&result.objects), vec![false, false]);
    assert_eq!(result.total, 2);
}

pub async fn filtering_on_deleted_false_returns_nothing<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let query = Query::new()
        .including_deleted()
        .with_filter(Filter::new(DELETED_FIELD, false, Comparison::Eq));
    let result = fx.get_all(query).await;
    assert!(result.objects.is_empty());
    assert_eq!(result.total, 0);
}

pub async fn filtering_on_deleted_without_include_returns_nothing<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({})).await;
    fx.create_and_delete(json!({})).await;

    let query = Query::new().with_filter(Filter::new(DELETED_FIELD, true, Comparison::Eq));
    let result = fx.get_all(query).await;
    assert!(result.objects.is_empty());
}

pub async fn pagination_rules_on_last_modified_apply_to_deleted_objects<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    let mut cutoff = None;
    for i in 0..15 {
        if i % 2 == 0 {
            let tombstone = fx.create_and_delete(json!({"rank": i})).await;
            cutoff.get_or_insert(tombstone.last_modified().unwrap());
        } else {
            fx.create(json!({"rank": i})).await;
        }
    }
    let cutoff = cutoff.unwrap();

    let query = Query::new()
        .including_deleted()
        .with_sort(Sort::asc(MODIFIED_FIELD))
        .with_pagination_rules(vec![vec![Filter::new(MODIFIED_FIELD, cutoff, Comparison::Gt)]])
        .with_limit(5);
    let result = fx.get_all(query).await;
    assert_eq!(
        deleted_flags(&result.objects),
        vec![false, true, false, true, false]
    );
    assert_eq!(result.total, 7);
}
