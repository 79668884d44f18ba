//! Persistent key-value store.
//!
//! A process-wide namespace of string keys and string values with
//! last-writer-wins semantics, standing in for browser local storage.
//!
//! - [`MemoryBackend`]: in-process map with an optional byte quota
//! - [`RedbBackend`]: durable file-backed store on redb
//!
//! All operations are synchronous; the stores on top of this only hold the
//! backend for short, non-async sections.

mod durable;
mod memory;


pub use durable::RedbBackend;
pub use memory::MemoryBackend;

use std::sync::Arc;

/// Errors surfaced by a [`KvBackend`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The write would push the store past its quota.
    #[error("storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    /// The underlying engine failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Backend contract for the persistent store.
///
/// Implementations must be safe to share across tasks.
pub trait KvBackend: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists every key starting with `prefix`, in key order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Shared handle to a persistent store.
pub type SharedStore = Arc<dyn KvBackend>;
