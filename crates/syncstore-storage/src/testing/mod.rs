//! Backend conformance suite.
//!
//! Every backend must give identical observable results for the checks in
//! this module. A backend crate implements [`ConformanceHarness`] and then
//! instantiates the whole suite with:
//!
//! ```ignore
//! syncstore_storage::storage_conformance_tests!(MyHarness::default());
//! ```
//!
//! which expands to one `#[tokio::test]` per check. The calling crate needs
//! `tokio` with the `macros` and `rt-multi-thread` features.
//!
//! Most checks drive the backend with a [`ManualClock`], so timestamps are
//! deterministic and no check sleeps.

use std::sync::Arc;

use async_trait::async_trait;

use crate::filter::{Comparison, Filter};
use crate::object::Object;
use crate::scope::{Scope, ScopePattern};
use crate::timestamp::{Clock, ManualClock};
use crate::traits::Storage;
use crate::types::{DeleteOptions, Query, QueryResult};

mod deletion;
mod heartbeat;
mod objects;
mod queries;
mod timestamps;

pub use deletion::*;
pub use heartbeat::*;
pub use objects::*;
pub use queries::*;
pub use timestamps::*;

/// Initial reading of the manual clock used by the checks.
pub const START_MILLIS: i64 = 1_500_000_000_000;

/// Builds and manipulates backends under test.
#[async_trait]
pub trait ConformanceHarness: Send + Sync {
    type Backend: Storage + 'static;

    /// A fresh, empty, writable backend driven by `clock`.
    async fn backend(&self, clock: Arc<dyn Clock>) -> Arc<Self::Backend>;

    /// Toggles read-only mode.
    fn set_readonly(&self, backend: &Self::Backend, readonly: bool);

    /// Makes every subsequent driver call fail (or work again).
    fn break_client(&self, backend: &Self::Backend, broken: bool);
}

/// Builds an [`Object`] from a JSON literal.
///
/// # Panics
///
/// Panics when `json` is not a JSON object.
pub fn object(json: serde_json::Value) -> Object {
    Object::try_from(json).expect("conformance objects are JSON objects")
}

/// A backend plus the scopes and clock the checks use.
pub struct Fixture<B> {
    pub storage: Arc<B>,
    pub clock: Arc<ManualClock>,
    pub scope: Scope,
    pub other_scope: Scope,
}

impl<B: Storage + 'static> Fixture<B> {
    pub async fn new<H: ConformanceHarness<Backend = B>>(harness: &H) -> Self {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let storage = harness.backend(clock.clone()).await;
        Self {
            storage,
            clock,
            scope: Scope::new("test", "1234"),
            other_scope: Scope::new("test", "5678"),
        }
    }

    /// Pattern selecting exactly the default scope.
    pub fn pattern(&self) -> ScopePattern {
        ScopePattern::from(&self.scope)
    }

    pub async fn create(&self, json: serde_json::Value) -> Object {
        self.create_in(&self.scope, json).await
    }

    pub async fn create_in(&self, scope: &Scope, json: serde_json::Value) -> Object {
        self.storage
            .create(scope, &object(json), None)
            .await
            .expect("create should succeed")
    }

    pub async fn delete(&self, id: &str) -> Object {
        self.storage
            .delete(&self.scope, id, DeleteOptions::new())
            .await
            .expect("delete should succeed")
            .expect("delete with tombstone returns it")
    }

    /// Creates an object and deletes it, returning the tombstone.
    pub async fn create_and_delete(&self, json: serde_json::Value) -> Object {
        let created = self.create(json).await;
        self.delete(created.id().expect("created objects have an id"))
            .await
    }

    pub async fn get_all(&self, query: Query) -> QueryResult {
        self.get_all_in(&self.pattern(), query).await
    }

    pub async fn get_all_in(&self, pattern: &ScopePattern, query: Query) -> QueryResult {
        self.storage
            .get_all(pattern, &query)
            .await
            .expect("get_all should succeed")
    }

    pub async fn timestamp(&self) -> i64 {
        self.timestamp_of(&self.scope).await
    }

    pub async fn timestamp_of(&self, scope: &Scope) -> i64 {
        self.storage
            .resource_timestamp(scope)
            .await
            .expect("resource_timestamp should succeed")
    }

    /// Filters selecting only what is written from now on.
    pub async fn written_from_now(&self) -> Vec<Filter> {
        let start = self.timestamp().await;
        vec![Filter::new(crate::MODIFIED_FIELD, start, Comparison::Gt)]
    }
}

/// Ids of objects, in order.
pub fn ids(objects: &[Object]) -> Vec<String> {
    objects
        .iter()
        .filter_map(|o| o.id().map(str::to_string))
        .collect()
}

/// Expands to one `#[tokio::test]` per conformance check.
#[macro_export]
macro_rules! storage_conformance_tests {
    ($harness:expr) => {
        $crate::storage_conformance_tests!(@checks $harness;
            // Backend errors and administration
            raises_backend_error_if_client_fails,
            backend_error_provides_original_failure,
            initialize_schema_is_idempotent,
            flush_removes_everything,
            reports_backend_name,
            // Objects
            create_adds_the_object_id,
            create_works_as_expected,
            create_copies_the_object_before_modifying_it,
            create_uses_the_id_generator,
            create_supports_unicode_for_parent_and_id,
            create_does_not_overwrite_the_provided_id,
            create_raises_unicity_error_if_provided_id_exists,
            create_generates_a_new_last_modified_field,
            get_raises_on_object_not_found,
            update_creates_a_new_object_when_needed,
            update_overwrites_object_id,
            update_generates_a_new_last_modified_field_if_not_present,
            delete_works_properly,
            delete_can_specify_the_last_modified,
            delete_raises_when_unknown,
            create_bytes_raises,
            update_bytes_raises,
            parent_cannot_access_other_parent_object,
            parent_cannot_delete_other_parent_object,
            parent_cannot_update_other_parent_object,
            // Queries
            get_all_handles_parent_id_pattern_matching,
            get_all_does_proper_parent_id_pattern_matching,
            get_all_parent_id_handles_collisions,
            get_all_returns_all_values,
            get_all_handles_limit,
            get_all_handles_sorting_on_id,
            get_all_handles_sorting_on_subobject,
            get_all_sorting_is_consistent_with_filtering,
            get_all_can_filter_with_list_of_values,
            get_all_can_filter_with_list_of_excluded_values,
            get_all_returns_empty_when_including_list_of_empty_values,
            get_all_can_filter_on_array_that_contains_values,
            get_all_can_filter_on_array_that_contains_any_value,
            get_all_contains_ignores_non_arrays_and_unsupported_types,
            get_all_can_filter_with_numeric_values,
            get_all_can_filter_with_numeric_strings,
            get_all_can_filter_with_empty_numeric_strings,
            get_all_can_filter_with_float_values,
            get_all_can_filter_minimum_value_with_strings,
            get_all_does_not_implicitly_cast,
            get_all_can_deal_with_missing_values,
            get_all_can_filter_with_null_values,
            get_all_can_filter_matching_a_list_or_an_object,
            get_all_supports_has,
            get_all_can_filter_by_subobject_values,
            get_all_can_filter_with_like,
            count_all_counts_live_matching_objects,
            get_all_handles_pagination_rules,
            get_all_handles_all_pagination_rules,
            pagination_can_skip_everything,
            get_all_parent_id_paginates_correctly,
            get_all_paginates_across_scopes_sharing_a_timestamp,
            get_all_paginates_with_cursor,
            // Timestamps
            timestamps_are_incremented_on_create,
            timestamps_are_incremented_on_update,
            timestamps_are_incremented_on_delete,
            timestamps_are_unique_under_concurrent_writes,
            timestamp_is_stable_while_scope_remains_empty,
            timestamps_are_based_on_real_time_milliseconds,
            timestamps_are_always_incremented_above_existing_value,
            resource_timestamp_fails_when_empty_and_readonly,
            resource_timestamp_returns_current_while_readonly,
            create_uses_specified_last_modified_if_scope_empty,
            create_ignores_specified_last_modified_if_in_the_past,
            create_ignores_specified_last_modified_if_equal,
            update_uses_specified_last_modified_if_in_future,
            update_ignores_specified_last_modified_if_in_the_past,
            update_ignores_specified_last_modified_if_equal,
            // Tombstones
            get_does_not_return_deleted_items,
            deleting_a_deleted_item_raises_not_found,
            recreating_a_deleted_object_removes_its_tombstone,
            deleting_an_object_twice_updates_its_tombstone,
            deleted_items_have_only_basic_fields,
            last_modified_of_a_deleted_item_is_deletion_time,
            get_all_does_not_include_deleted_items_by_default,
            get_all_count_does_not_include_deleted_items,
            get_all_can_return_deleted_items,
            delete_all_keeps_track_of_deleted_objects,
            delete_all_returns_objects_before_deletion,
            delete_all_can_delete_without_tombstones,
            delete_can_delete_without_tombstones,
            deleting_without_tombstone_raises_not_found,
            delete_all_can_delete_by_parent_id,
            delete_all_does_proper_parent_id_matching,
            delete_all_can_delete_by_parent_id_with_tombstones,
            delete_all_can_delete_partially,
            delete_all_supports_limit,
            delete_all_supports_sorting,
            delete_all_supports_pagination_rules,
            purge_deleted_removes_all_tombstones,
            purge_deleted_removes_tombstones_by_parent_id,
            purge_deleted_retires_timestamps_by_parent_id,
            purge_deleted_works_when_no_tombstones,
            purge_deleted_before_is_exclusive,
            purge_deleted_can_retain_newest_tombstones,
            purge_deleted_rejects_before_with_max_retained,
            sorting_on_last_modified_applies_to_deleted_items,
            sorting_on_last_modified_mixes_deleted_objects,
            sorting_on_arbitrary_field_groups_deleted_last,
            sorting_on_deleted_field_groups_deleted_first,
            filtering_on_last_modified_applies_to_deleted_items,
            filtering_on_arbitrary_field_excludes_deleted_objects,
            filtering_on_deleted_field,
            filtering_out_on_deleted_field,
            filtering_on_deleted_false_returns_nothing,
            filtering_on_deleted_without_include_returns_nothing,
            pagination_rules_on_last_modified_apply_to_deleted_objects,
            // Heartbeat
            ping_returns_true_when_working,
            ping_returns_true_when_working_in_readonly_mode,
            ping_returns_false_if_unavailable,
            ping_logs_error_if_unavailable,
            ping_returns_false_if_unavailable_in_readonly_mode,
            ping_leaves_no_tombstone,
        );
    };
    (@checks $harness:expr; $($check:ident),* $(,)?) => {
        $(
            #[::tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn $check() {
                let harness = $harness;
                $crate::testing::$check(&harness).await;
            }
        )*
    };
}
