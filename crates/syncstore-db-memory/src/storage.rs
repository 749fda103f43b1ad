use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info};

use syncstore_storage::sort::{compare_objects, sort_objects};
use syncstore_storage::timestamp::{baseline_timestamp, next_timestamp};
use syncstore_storage::tombstone::{PurgeCriteria, tombstone};
use syncstore_storage::{
    BackendResultExt, Clock, DEFAULT_MAX_FETCH_SIZE, DeleteOptions, Filter, FilterMatcher,
    IdGenerator, Object, PaginationMatcher, Query, QueryResult, ReadOnlyError, Scope,
    ScopePattern, Storage, StorageError, SystemClock, UuidGenerator,
};

type SharedScope = Arc<RwLock<ScopeState>>;
type ScopeGuard = OwnedRwLockWriteGuard<ScopeState>;

/// Everything stored under one scope.
///
/// The lock around it makes timestamp allocation and the write it stamps a
/// single step.
#[derive(Debug, Default)]
struct ScopeState {
    objects: BTreeMap<String, Object>,
    tombstones: BTreeMap<String, Object>,
    timestamp: Option<i64>,
}

impl ScopeState {
    fn newest(&self) -> Option<i64> {
        self.objects
            .values()
            .chain(self.tombstones.values())
            .filter_map(Object::last_modified)
            .max()
    }

    /// Allocates the timestamp of the next write and records it.
    fn bump(&mut self, requested: Option<i64>, now: i64) -> i64 {
        let current = self.timestamp.or_else(|| self.newest());
        let next = next_timestamp(current, requested, now);
        self.timestamp = Some(next);
        next
    }

    fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.tombstones.is_empty()
    }
}

/// In-memory storage backend using a papaya lock-free HashMap of scopes.
///
/// This storage implementation provides:
/// - Lock-free lookup of scopes, one `RwLock` per scope for writes
/// - Strictly increasing per-scope timestamps from an injectable [`Clock`]
/// - Tombstones for deleted objects until they are purged
/// - Runtime read-only mode and simulated client failures
pub struct InMemoryStorage {
    scopes: PapayaHashMap<Scope, SharedScope>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    max_fetch_size: usize,
    readonly: AtomicBool,
    unavailable: AtomicBool,
}

impl fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("scopes", &self.scopes.len())
            .field("clock", &self.clock)
            .field("max_fetch_size", &self.max_fetch_size)
            .field("readonly", &self.readonly())
            .finish()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Creates an empty writable storage on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty writable storage stamping writes with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            scopes: PapayaHashMap::new(),
            clock,
            id_generator: Arc::new(UuidGenerator),
            max_fetch_size: DEFAULT_MAX_FETCH_SIZE,
            readonly: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_max_fetch_size(mut self, max_fetch_size: usize) -> Self {
        self.max_fetch_size = max_fetch_size.max(1);
        self
    }

    /// Replaces the generator used when neither the object nor the caller
    /// supplies an id.
    #[must_use]
    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    #[must_use]
    pub fn with_readonly(self, readonly: bool) -> Self {
        self.set_readonly(readonly);
        self
    }

    pub fn set_readonly(&self, readonly: bool) {
        self.readonly.store(readonly, Ordering::Release);
    }

    /// Simulates an unreachable client: every operation fails with a
    /// backend error until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    fn client(&self, operation: &str) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "in-memory client is unavailable",
            ))
            .or_backend(operation);
        }
        Ok(())
    }

    fn scope_state(&self, scope: &Scope) -> SharedScope {
        let scopes = self.scopes.pin();
        scopes
            .get_or_insert_with(scope.clone(), SharedScope::default)
            .clone()
    }

    fn existing_scope(&self, scope: &Scope) -> Option<SharedScope> {
        self.scopes.pin().get(scope).cloned()
    }

    /// Write-locks `shared`, unless purge or flush detached it from the map
    /// while we waited.
    async fn lock_attached(&self, scope: &Scope, shared: SharedScope) -> Option<ScopeGuard> {
        let guard = shared.clone().write_owned().await;
        let attached = self
            .scopes
            .pin()
            .get(scope)
            .is_some_and(|current| Arc::ptr_eq(current, &shared));
        attached.then_some(guard)
    }

    /// Write-locks the state of `scope`, creating it on first write.
    async fn lock_scope(&self, scope: &Scope) -> ScopeGuard {
        loop {
            if let Some(guard) = self.lock_attached(scope, self.scope_state(scope)).await {
                return guard;
            }
        }
    }

    async fn lock_existing_scope(&self, scope: &Scope) -> Option<ScopeGuard> {
        loop {
            let shared = self.existing_scope(scope)?;
            if let Some(guard) = self.lock_attached(scope, shared).await {
                return Some(guard);
            }
        }
    }

    /// Drops the entry of `scope` if it still holds `shared`.
    ///
    /// Callers hold the write lock of `shared`, so no write can land in it
    /// afterwards.
    fn detach(&self, scope: &Scope, shared: &SharedScope) {
        let _ = self
            .scopes
            .pin()
            .remove_if(scope, |_, current| Arc::ptr_eq(current, shared));
    }

    /// Scopes matched by `pattern`, in scope order.
    fn matching_scopes(&self, pattern: &ScopePattern) -> Vec<(Scope, SharedScope)> {
        if let Some(scope) = pattern.exact() {
            return self
                .existing_scope(&scope)
                .map(|state| vec![(scope, state)])
                .unwrap_or_default();
        }
        let scopes = self.scopes.pin();
        let mut matched: Vec<_> = scopes
            .iter()
            .filter(|(scope, _)| pattern.matches(scope))
            .map(|(scope, state)| (scope.clone(), state.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        matched
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn initialize_schema(&self) -> Result<(), StorageError> {
        self.client("initialize_schema")?;
        debug!("Nothing to initialize for the in-memory backend");
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.client("flush")?;
        self.scopes.pin().clear();
        info!("Flushed in-memory storage");
        Ok(())
    }

    async fn resource_timestamp(&self, scope: &Scope) -> Result<i64, StorageError> {
        self.client("resource_timestamp")?;
        if let Some(shared) = self.existing_scope(scope)
            && let Some(timestamp) = shared.read().await.timestamp
        {
            return Ok(timestamp);
        }
        if self.readonly() {
            return Err(ReadOnlyError {
                scope: scope.to_string(),
            })
            .or_backend("resource_timestamp");
        }

        let mut state = self.lock_scope(scope).await;
        let newest = state.newest();
        let now = self.clock.now_millis();
        Ok(*state
            .timestamp
            .get_or_insert_with(|| baseline_timestamp(now, newest)))
    }

    async fn create(
        &self,
        scope: &Scope,
        object: &Object,
        id_generator: Option<&dyn IdGenerator>,
    ) -> Result<Object, StorageError> {
        self.client("create")?;
        object.ensure_storable()?;

        let mut stored = object.clone();
        let id = match object.id() {
            Some(id) => id.to_string(),
            None => id_generator.map_or_else(|| self.id_generator.generate(), |g| g.generate()),
        };
        stored.set_id(id.clone());

        let mut state = self.lock_scope(scope).await;
        if state.objects.contains_key(&id) {
            return Err(StorageError::unicity(scope, id));
        }
        let last_modified = state.bump(object.last_modified(), self.clock.now_millis());
        stored.set_last_modified(last_modified);
        state.tombstones.remove(&id);
        state.objects.insert(id.clone(), stored.clone());

        debug!(
            resource_name = %scope.resource_name,
            parent_id = %scope.parent_id,
            object_id = %id,
            last_modified,
            "Created object"
        );
        Ok(stored)
    }

    async fn get(&self, scope: &Scope, id: &str) -> Result<Object, StorageError> {
        self.client("get")?;
        let Some(shared) = self.existing_scope(scope) else {
            return Err(StorageError::not_found(scope, id));
        };
        let state = shared.read().await;
        state
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(scope, id))
    }

    async fn update(
        &self,
        scope: &Scope,
        id: &str,
        object: &Object,
    ) -> Result<Object, StorageError> {
        self.client("update")?;
        object.ensure_storable()?;

        let mut stored = object.clone();
        stored.set_id(id);

        let mut state = self.lock_scope(scope).await;
        let last_modified = state.bump(object.last_modified(), self.clock.now_millis());
        stored.set_last_modified(last_modified);
        state.tombstones.remove(id);
        state.objects.insert(id.to_string(), stored.clone());

        debug!(
            resource_name = %scope.resource_name,
            parent_id = %scope.parent_id,
            object_id = %id,
            last_modified,
            "Updated object"
        );
        Ok(stored)
    }

    async fn delete(
        &self,
        scope: &Scope,
        id: &str,
        options: DeleteOptions,
    ) -> Result<Option<Object>, StorageError> {
        self.client("delete")?;
        let Some(mut state) = self.lock_existing_scope(scope).await else {
            return Err(StorageError::not_found(scope, id));
        };
        if !state.objects.contains_key(id) {
            return Err(StorageError::not_found(scope, id));
        }

        let last_modified = state.bump(options.last_modified, self.clock.now_millis());
        state.objects.remove(id);
        debug!(
            resource_name = %scope.resource_name,
            parent_id = %scope.parent_id,
            object_id = %id,
            last_modified,
            with_deleted = options.with_deleted,
            "Deleted object"
        );

        if !options.with_deleted {
            return Ok(None);
        }
        let residue = tombstone(id, last_modified);
        state.tombstones.insert(id.to_string(), residue.clone());
        Ok(Some(residue))
    }

    async fn get_all(
        &self,
        pattern: &ScopePattern,
        query: &Query,
    ) -> Result<QueryResult, StorageError> {
        self.client("get_all")?;
        let filters = FilterMatcher::new(&query.filters)?;
        let rules = PaginationMatcher::new(&query.pagination_rules)?;

        let mut total = 0;
        let mut matched = Vec::new();
        for (_, shared) in self.matching_scopes(pattern) {
            let state = shared.read().await;
            for object in state.objects.values().filter(|o| filters.matches(o)) {
                total += 1;
                if rules.matches(object) {
                    matched.push(object.clone());
                }
            }
            if query.include_deleted {
                matched.extend(
                    state
                        .tombstones
                        .values()
                        .filter(|t| filters.matches(t) && rules.matches(t))
                        .cloned(),
                );
            }
        }

        sort_objects(&mut matched, &query.effective_sorting());
        let limit = query
            .limit
            .map_or(self.max_fetch_size, |limit| limit.min(self.max_fetch_size));
        matched.truncate(limit);
        Ok(QueryResult::new(matched, total))
    }

    async fn count_all(
        &self,
        pattern: &ScopePattern,
        filters: &[Filter],
    ) -> Result<usize, StorageError> {
        self.client("count_all")?;
        let filters = FilterMatcher::new(filters)?;
        let mut count = 0;
        for (_, shared) in self.matching_scopes(pattern) {
            let state = shared.read().await;
            count += state.objects.values().filter(|o| filters.matches(o)).count();
        }
        Ok(count)
    }

    async fn delete_all(
        &self,
        pattern: &ScopePattern,
        query: &Query,
        with_deleted: bool,
    ) -> Result<Vec<Object>, StorageError> {
        self.client("delete_all")?;
        let filters = FilterMatcher::new(&query.filters)?;
        let rules = PaginationMatcher::new(&query.pagination_rules)?;
        let sorting = query.effective_sorting();

        // Locks are taken in scope order so concurrent bulk deletes cannot deadlock.
        let scopes = self.matching_scopes(pattern);
        let mut states: Vec<ScopeGuard> = Vec::with_capacity(scopes.len());
        for (scope, shared) in scopes {
            if let Some(guard) = self.lock_attached(&scope, shared).await {
                states.push(guard);
            }
        }

        let mut doomed: Vec<(usize, Object)> = states
            .iter()
            .enumerate()
            .flat_map(|(index, state)| {
                state
                    .objects
                    .values()
                    .filter(|o| filters.matches(o) && rules.matches(o))
                    .map(move |o| (index, o.clone()))
            })
            .collect();
        doomed.sort_by(|a, b| compare_objects(&a.1, &b.1, &sorting));
        if let Some(limit) = query.limit {
            doomed.truncate(limit);
        }

        let now = self.clock.now_millis();
        let mut removed = Vec::with_capacity(doomed.len());
        for (index, object) in doomed {
            let Some(id) = object.id().map(str::to_string) else {
                continue;
            };
            let state = &mut states[index];
            let last_modified = state.bump(None, now);
            state.objects.remove(&id);
            if with_deleted {
                state
                    .tombstones
                    .insert(id.clone(), tombstone(&id, last_modified));
            }
            removed.push(object);
        }

        info!(
            pattern = %pattern,
            deleted = removed.len(),
            with_deleted,
            "Deleted objects in bulk"
        );
        Ok(removed)
    }

    async fn purge_deleted(
        &self,
        pattern: &ScopePattern,
        before: Option<i64>,
        max_retained: Option<usize>,
    ) -> Result<usize, StorageError> {
        self.client("purge_deleted")?;
        let criteria = PurgeCriteria::new(before, max_retained)?;

        let mut purged = 0;
        for (scope, shared) in self.matching_scopes(pattern) {
            let Some(mut state) = self.lock_attached(&scope, shared.clone()).await else {
                continue;
            };
            let ids = criteria.select(state.tombstones.values());
            for id in &ids {
                state.tombstones.remove(id);
            }
            purged += ids.len();
            if state.is_empty() {
                // Retires the timestamp along with the entry.
                state.timestamp = None;
                self.detach(&scope, &shared);
                debug!(scope = %scope, "Retired empty scope");
            }
        }

        info!(pattern = %pattern, purged, "Purged tombstones");
        Ok(purged)
    }

    fn readonly(&self) -> bool {
        self.readonly.load(Ordering::Acquire)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncstore_storage::{Comparison, ManualClock, Sort};

    const NOW: i64 = 1_000_000;

    fn storage() -> (InMemoryStorage, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        (InMemoryStorage::with_clock(clock.clone()), clock)
    }

    fn scope() -> Scope {
        Scope::new("articles", "/buckets/blog")
    }

    fn body(title: &str) -> Object {
        [("title", title)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_storage_basic_operations() {
        let (storage, _) = storage();
        let scope = scope();

        let created = storage.create(&scope, &body("hello"), None).await.unwrap();
        let id = created.id().unwrap().to_string();
        assert_eq!(created.last_modified(), Some(NOW));

        let retrieved = storage.get(&scope, &id).await.unwrap();
        assert_eq!(retrieved, created);

        let updated = storage.update(&scope, &id, &body("bye")).await.unwrap();
        assert_eq!(updated.last_modified(), Some(NOW + 1));

        let tombstone = storage
            .delete(&scope, &id, DeleteOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert!(tombstone.is_deleted());
        assert!(storage.get(&scope, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_first_timestamp_read_sets_baseline() {
        let (storage, clock) = storage();
        let scope = scope();
        assert_eq!(storage.resource_timestamp(&scope).await.unwrap(), NOW);
        clock.advance(50);
        assert_eq!(storage.resource_timestamp(&scope).await.unwrap(), NOW);

        let created = storage.create(&scope, &body("a"), None).await.unwrap();
        assert_eq!(created.last_modified(), Some(NOW + 50));
    }

    #[tokio::test]
    async fn test_readonly_refuses_new_timestamp_state() {
        let (storage, _) = storage();
        let storage = storage.with_readonly(true);
        let err = storage.resource_timestamp(&scope()).await.unwrap_err();
        let StorageError::Backend(backend) = err else {
            panic!("expected backend error");
        };
        assert!(backend.original().to_string().contains("readonly"));
    }

    #[tokio::test]
    async fn test_unavailable_client_fails_every_call() {
        let (storage, _) = storage();
        storage.set_unavailable(true);
        let err = storage.get(&scope(), "x").await.unwrap_err();
        assert!(err.is_backend());
        storage.set_unavailable(false);
        assert!(storage.get(&scope(), "x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_all_caps_at_max_fetch_size() {
        let (storage, _) = storage();
        let storage = storage.with_max_fetch_size(3);
        let scope = scope();
        for i in 0..5 {
            storage
                .create(&scope, &body(&format!("t{i}")), None)
                .await
                .unwrap();
        }

        let page = storage
            .get_all(&ScopePattern::from(&scope), &Query::new())
            .await
            .unwrap();
        assert_eq!(page.objects.len(), 3);
        assert_eq!(page.total, 5);

        let page = storage
            .get_all(&ScopePattern::from(&scope), &Query::new().with_limit(10))
            .await
            .unwrap();
        assert_eq!(page.objects.len(), 3);
    }

    #[tokio::test]
    async fn test_default_id_generator_is_replaceable() {
        let (storage, _) = storage();
        let storage = storage.with_id_generator(Arc::new(|| "fixed".to_string()));
        let created = storage.create(&scope(), &body("a"), None).await.unwrap();
        assert_eq!(created.id(), Some("fixed"));
        let err = storage.create(&scope(), &body("b"), None).await.unwrap_err();
        assert!(err.is_unicity());
    }

    #[tokio::test]
    async fn test_invalid_like_operand_is_rejected() {
        let (storage, _) = storage();
        let query = Query::new().with_filter(Filter::new("title", 3, Comparison::Like));
        let err = storage
            .get_all(&ScopePattern::from(&scope()), &query)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn test_delete_all_stamps_each_tombstone() {
        let (storage, _) = storage();
        let scope = scope();
        for title in ["a", "b", "c"] {
            storage.create(&scope, &body(title), None).await.unwrap();
        }

        let removed = storage
            .delete_all(
                &ScopePattern::from(&scope),
                &Query::new().with_sort(Sort::asc("title")),
                true,
            )
            .await
            .unwrap();
        let titles: Vec<_> = removed
            .iter()
            .filter_map(|o| o.get("title")?.as_str())
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        let page = storage
            .get_all(&ScopePattern::from(&scope), &Query::new().including_deleted())
            .await
            .unwrap();
        let mut stamps: Vec<_> = page.objects.iter().filter_map(Object::last_modified).collect();
        stamps.sort_unstable();
        stamps.dedup();
        assert_eq!(stamps.len(), 3);
        assert_eq!(
            storage.resource_timestamp(&scope).await.unwrap(),
            *stamps.last().unwrap()
        );
    }

    #[tokio::test]
    async fn test_readonly_reads_leave_no_scope_behind() {
        let (storage, _) = storage();
        let storage = storage.with_readonly(true);
        for i in 0..50 {
            let scope = Scope::new("articles", format!("/buckets/{i}"));
            assert!(storage.resource_timestamp(&scope).await.is_err());
            assert!(storage.get(&scope, "x").await.unwrap_err().is_not_found());
            assert!(storage.delete(&scope, "x", DeleteOptions::new()).await.is_err());
        }
        assert_eq!(storage.scopes.pin().len(), 0);
    }

    #[tokio::test]
    async fn test_purge_drops_emptied_scopes() {
        let (storage, clock) = storage();
        let scope = scope();
        let kept = Scope::new("articles", "/buckets/kept");
        let created = storage.create(&scope, &body("a"), None).await.unwrap();
        storage.create(&kept, &body("b"), None).await.unwrap();
        storage
            .delete(&scope, created.id().unwrap(), DeleteOptions::new())
            .await
            .unwrap();
        assert_eq!(storage.scopes.pin().len(), 2);

        let purged = storage
            .purge_deleted(&ScopePattern::new("articles", "*"), None, None)
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(storage.scopes.pin().len(), 1);

        clock.advance(10);
        assert_eq!(storage.resource_timestamp(&scope).await.unwrap(), NOW + 10);
        let recreated = storage.create(&scope, &body("c"), None).await.unwrap();
        assert_eq!(recreated.last_modified(), Some(NOW + 11));
    }

    #[tokio::test]
    async fn test_flush_forgets_timestamps() {
        let (storage, clock) = storage();
        let scope = scope();
        storage.create(&scope, &body("a"), None).await.unwrap();
        clock.set(NOW - 500);
        storage.flush().await.unwrap();
        assert_eq!(storage.resource_timestamp(&scope).await.unwrap(), NOW - 500);
    }
}
