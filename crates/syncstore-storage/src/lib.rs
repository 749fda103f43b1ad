//! # syncstore-storage
//!
//! Storage contract for a multi-tenant JSON object synchronization service.
//!
//! This crate defines the value model, query semantics and the [`Storage`]
//! trait every backend implements. Backends live in separate crates.
//!
//! ## Overview
//!
//! - Objects are stored per [`Scope`] `(resource_name, parent_id)`.
//! - Every write gets a strictly increasing `last_modified` per scope.
//! - Deletes leave tombstones (`{id, last_modified, deleted: true}`) that
//!   sync clients use to detect removals, until they are purged.
//! - `get_all` answers filtered, sorted, cursor-paginated queries.
//!
//! ## Example
//!
//! ```ignore
//! use syncstore_storage::prelude::*;
//!
//! async fn first_page(storage: &dyn Storage) -> StorageResult<Option<String>> {
//!     let query = Query::new()
//!         .with_filter(Filter::new("status", "open", Comparison::Eq))
//!         .with_sort(Sort::desc("priority"))
//!         .with_limit(20);
//!     let page = storage
//!         .get_all(&ScopePattern::new("task", "/projects/p1"), &query)
//!         .await?;
//!     page.next_cursor(&query).map(|cursor| cursor.encode()).transpose()
//! }
//! ```
//!
//! ## Backend conformance
//!
//! With the `testing` feature, [`testing`] exposes the shared conformance
//! suite. A backend implements [`testing::ConformanceHarness`] and invokes
//! [`storage_conformance_tests!`] once.

mod error;
pub mod filter;
pub mod heartbeat;
mod id;
mod object;
pub mod pagination;
mod scope;
pub mod sort;
pub mod timestamp;
pub mod tombstone;
mod traits;
mod types;
pub mod value;

#[cfg(feature = "testing")]
pub mod testing;

// Re-export everything from submodules
pub use error::{
    BackendError, BackendResultExt, BoxError, ErrorCategory, ReadOnlyError, StorageError,
};
pub use filter::{Comparison, Filter, FilterMatcher, PaginationMatcher};
pub use heartbeat::{FastRandSource, FixedRandom, Heartbeat, RandomSource};
pub use id::{IdGenerator, UuidGenerator};
pub use object::{DELETED_FIELD, ID_FIELD, MODIFIED_FIELD, Object};
pub use pagination::{Cursor, build_pagination_rules};
pub use scope::{Scope, ScopePattern};
pub use sort::{Direction, Sort};
pub use timestamp::{Clock, ManualClock, SystemClock};
pub use traits::Storage;
pub use types::{DeleteOptions, Query, QueryResult};
pub use value::Value;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn Storage>;

/// Default cap on the number of objects a single `get_all` returns.
pub const DEFAULT_MAX_FETCH_SIZE: usize = 10_000;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use syncstore_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::filter::{Comparison, Filter};
    pub use crate::object::Object;
    pub use crate::pagination::Cursor;
    pub use crate::scope::{Scope, ScopePattern};
    pub use crate::sort::Sort;
    pub use crate::traits::Storage;
    pub use crate::types::{DeleteOptions, Query, QueryResult};
    pub use crate::value::Value;
    pub use crate::{DynStorage, StorageResult};
}
