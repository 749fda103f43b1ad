//! The storage façade every backend implements.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::filter::Filter;
use crate::id::IdGenerator;
use crate::object::Object;
use crate::scope::{Scope, ScopePattern};
use crate::types::{DeleteOptions, Query, QueryResult};

/// The storage contract.
///
/// Objects live in scopes identified by `(resource_name, parent_id)`; no
/// operation on one scope observes another. Every write stamps the object
/// with a `last_modified` strictly greater than any earlier write to the
/// same scope. Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use syncstore_storage::{Object, Scope, Storage, StorageError};
///
/// async fn rename(
///     storage: &dyn Storage,
///     scope: &Scope,
///     id: &str,
/// ) -> Result<Object, StorageError> {
///     let mut object = storage.get(scope, id).await?;
///     object.insert("name", "renamed");
///     storage.update(scope, id, &object).await
/// }
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
    // ==================== Administration ====================

    /// Prepares the backend. Calling it repeatedly is harmless.
    async fn initialize_schema(&self) -> Result<(), StorageError>;

    /// Erases every scope, object, tombstone and timestamp.
    async fn flush(&self) -> Result<(), StorageError>;

    /// Returns the current scope timestamp.
    ///
    /// The first read of a scope without state establishes a baseline,
    /// and repeated reads return the same value.
    ///
    /// # Errors
    ///
    /// Returns a `Backend` error wrapping a read-only refusal when the scope
    /// has no state and the backend is read-only.
    async fn resource_timestamp(&self, scope: &Scope) -> Result<i64, StorageError>;

    // ==================== Single objects ====================

    /// Stores a new object.
    ///
    /// The id comes from the object, else from `id_generator`, else from the
    /// backend's default generator. A `last_modified` on the object is a
    /// request, honoured only when it keeps the scope timestamp increasing.
    ///
    /// # Errors
    ///
    /// * `Unicity` when a live object already has the id.
    /// * `UnsupportedValue` when a field holds raw binary data.
    async fn create(
        &self,
        scope: &Scope,
        object: &Object,
        id_generator: Option<&dyn IdGenerator>,
    ) -> Result<Object, StorageError>;

    /// Fetches a live object.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` when the id is absent or tombstoned.
    async fn get(&self, scope: &Scope, id: &str) -> Result<Object, StorageError>;

    /// Replaces (or creates) the object at `id`. The body's own `id` is ignored.
    ///
    /// # Errors
    ///
    /// `UnsupportedValue` when a field holds raw binary data.
    async fn update(&self, scope: &Scope, id: &str, object: &Object)
    -> Result<Object, StorageError>;

    /// Deletes a live object, returning its tombstone.
    ///
    /// Returns `None` when `options.with_deleted` is false: the object is
    /// removed without residue. The scope timestamp advances either way.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` when the id is absent or already tombstoned.
    async fn delete(
        &self,
        scope: &Scope,
        id: &str,
        options: DeleteOptions,
    ) -> Result<Option<Object>, StorageError>;

    // ==================== Collections ====================

    /// Lists objects of every scope matched by `pattern`.
    ///
    /// The page honours filters, sorting, pagination rules, limit and
    /// `include_deleted`. `total` counts live objects matching the filters
    /// only.
    async fn get_all(
        &self,
        pattern: &ScopePattern,
        query: &Query,
    ) -> Result<QueryResult, StorageError>;

    /// Counts live objects matching `filters` in every matched scope.
    async fn count_all(
        &self,
        pattern: &ScopePattern,
        filters: &[Filter],
    ) -> Result<usize, StorageError>;

    /// Deletes every live object selected by `query`.
    ///
    /// Returns the objects as they were before deletion. Tombstones are left
    /// behind when `with_deleted` is true.
    async fn delete_all(
        &self,
        pattern: &ScopePattern,
        query: &Query,
        with_deleted: bool,
    ) -> Result<Vec<Object>, StorageError>;

    /// Permanently erases tombstones, returning how many were erased.
    ///
    /// `before` erases tombstones strictly older than the cutoff;
    /// `max_retained` keeps the newest N per scope.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when both `before` and `max_retained` are given.
    async fn purge_deleted(
        &self,
        pattern: &ScopePattern,
        before: Option<i64>,
        max_retained: Option<usize>,
    ) -> Result<usize, StorageError>;

    // ==================== Introspection ====================

    /// Whether the backend refuses writes.
    fn readonly(&self) -> bool;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure the trait stays usable as `dyn Storage`.
    fn _assert_object_safe(_: &dyn Storage) {}

    #[test]
    fn test_dyn_storage_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Storage>();
    }
}
