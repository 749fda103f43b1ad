//! In-memory storage backend for syncstore.
//!
//! This crate provides an in-memory implementation of the `Storage` trait
//! from `syncstore-storage`, using a papaya lock-free HashMap of scopes.
//!
//! # Example
//!
//! ```ignore
//! use syncstore_db_memory::InMemoryStorage;
//! use syncstore_storage::{Object, Scope, Storage};
//!
//! let storage = InMemoryStorage::new();
//! let scope = Scope::new("articles", "/buckets/blog");
//!
//! let article: Object = [("title", "Hello")].into_iter().collect();
//! let created = storage.create(&scope, &article, None).await?;
//! ```

pub mod factory;
pub mod storage;

pub use factory::{
    Bootstrap, FactoryError, StorageBackend, bootstrap, create_heartbeat, create_storage,
    create_storage_with_clock,
};
pub use storage::InMemoryStorage;

// Re-export the Storage trait for convenience
pub use syncstore_storage::{DynStorage, Storage, StorageError};
