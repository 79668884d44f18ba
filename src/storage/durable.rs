//! Durable persistent store backend on redb.
//!
//! Values survive process restarts, the analogue of local storage surviving
//! a page reload. Every write is its own ACID transaction.

use super::{KvBackend, StorageError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

/// Table holding every persisted key.
const LOCAL_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("local");

/// File-backed store wrapping a redb database.
///
/// `RedbBackend` is `Clone`; clones share the same database handle.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Opens or creates the database at `path`.
    ///
    /// Creates parent directories if needed and initializes the table so
    /// that reads on a fresh file do not fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!(
                    "failed to create storage directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let db = Database::create(path).map_err(|e| {
            StorageError::Backend(format!("failed to open {}: {e}", path.display()))
        })?;

        let write_txn = db.begin_write().map_err(StorageError::backend)?;
        {
            let _table = write_txn
                .open_table(LOCAL_TABLE)
                .map_err(StorageError::backend)?;
        }
        write_txn.commit().map_err(StorageError::backend)?;

        tracing::debug!(path = %path.display(), "Opened local store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl KvBackend for RedbBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::backend)?;
        let table = read_txn
            .open_table(LOCAL_TABLE)
            .map_err(StorageError::backend)?;

        let value = table
            .get(key)
            .map_err(StorageError::backend)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(StorageError::backend)?;
        {
            let mut table = write_txn
                .open_table(LOCAL_TABLE)
                .map_err(StorageError::backend)?;
            table.insert(key, value).map_err(StorageError::backend)?;
        }
        write_txn.commit().map_err(StorageError::backend)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write().map_err(StorageError::backend)?;
        let removed = {
            let mut table = write_txn
                .open_table(LOCAL_TABLE)
                .map_err(StorageError::backend)?;
            table.remove(key).map_err(StorageError::backend)?.is_some()
        };
        write_txn.commit().map_err(StorageError::backend)?;
        Ok(removed)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::backend)?;
        let table = read_txn
            .open_table(LOCAL_TABLE)
            .map_err(StorageError::backend)?;

        let mut keys = Vec::new();
        for item in table.iter().map_err(StorageError::backend)? {
            let (key, _) = item.map_err(StorageError::backend)?;
            let key = key.value();
            if key.starts_with(prefix) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }
}
