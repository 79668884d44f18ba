//! `OfflineCache` implementation.

use super::{CacheEntry, FetchOptions};
use crate::clock::{SharedClock, duration_millis};
use crate::network::SharedNetwork;
use crate::storage::SharedStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Counts gathered by [`OfflineCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries valid under the default ttl.
    pub fresh: usize,
    /// Parsable entries older than the default ttl.
    pub stale: usize,
    /// Unparsable or timestamp-less entries.
    pub corrupt: usize,
}

impl CacheStats {
    pub const fn total(&self) -> usize {
        self.fresh + self.stale + self.corrupt
    }
}

/// TTL cache over the persistent store.
///
/// `OfflineCache` is `Clone`; clones share the same store, clock and
/// connectivity source. There is no mutual exclusion between a read and a
/// write of the same key: the last write wins.
#[derive(Clone)]
pub struct OfflineCache {
    store: SharedStore,
    clock: SharedClock,
    network: SharedNetwork,
    prefix: String,
    default_ttl: Duration,
}

impl OfflineCache {
    pub fn new(
        store: SharedStore,
        clock: SharedClock,
        network: SharedNetwork,
        prefix: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            network,
            prefix: prefix.into(),
            default_ttl,
        }
    }

    /// The ttl used by the sweep and by callers that do not pick their own.
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Runs `fetcher` with a cached fallback.
    ///
    /// 1. Offline with a value valid under `ttl`: returns it without calling
    ///    `fetcher`.
    /// 2. Otherwise calls `fetcher`; on success stores and returns the result.
    /// 3. On failure with `fallback_on_error`, returns a valid cached value if
    ///    one exists. Otherwise the original error is returned unchanged.
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Duration,
        options: FetchOptions,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if !self.network.is_online()
            && let Some(cached) = self.read_cached::<T>(key, ttl)
        {
            debug!(key, "Offline, serving cached value");
            return Ok(cached);
        }

        match fetcher().await {
            Ok(value) => {
                self.write_cached(key, &value);
                Ok(value)
            },
            Err(err) => {
                if options.fallback_on_error
                    && let Some(cached) = self.read_cached::<T>(key, ttl)
                {
                    warn!(key, error = %err, "Fetch failed, serving cached value");
                    return Ok(cached);
                }
                Err(err)
            },
        }
    }

    /// Returns the cached value for `key` if it is valid under `ttl`.
    ///
    /// Corrupt, timestamp-less and expired entries are deleted and treated
    /// as a miss, as are entries whose payload does not decode into `T`.
    pub fn read_cached<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let storage_key = self.storage_key(key);
        let raw = match self.store.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            },
        };

        let Some(entry) = CacheEntry::parse(&raw) else {
            debug!(key, "Dropping corrupt cache entry");
            self.discard(&storage_key);
            return None;
        };

        if !entry.is_fresh(self.clock.now_millis(), duration_millis(ttl)) {
            debug!(key, "Dropping expired cache entry");
            self.discard(&storage_key);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "Cached payload has an unexpected shape");
                self.discard(&storage_key);
                None
            },
        }
    }

    /// Stores `value` under `key` with the current timestamp.
    ///
    /// A failed write triggers an expired-entry sweep and is not retried.
    pub fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "Value is not cacheable");
                return;
            },
        };
        let entry = CacheEntry::new(self.clock.now_millis(), data);

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            },
        };

        if let Err(e) = self.store.set(&self.storage_key(key), &raw) {
            warn!(key, error = %e, "Cache write failed, sweeping expired entries");
            let removed = self.clear_expired_cache();
            debug!(removed, "Sweep after failed cache write");
        }
    }

    /// Deletes every entry under the prefix that is corrupt or older than
    /// the default ttl. Returns the number of entries removed.
    ///
    /// The sweep uses the default ttl, not the ttl each entry was read with,
    /// so an entry a caller reads with a longer ttl can be swept while still
    /// valid for that caller.
    pub fn clear_expired_cache(&self) -> usize {
        let keys = match self.store.keys_with_prefix(&self.prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list cache entries");
                return 0;
            },
        };

        let now = self.clock.now_millis();
        let ttl = duration_millis(self.default_ttl);
        let mut removed = 0;

        for key in keys {
            let expired = match self.store.get(&key) {
                Ok(Some(raw)) => CacheEntry::parse(&raw).is_none_or(|e| !e.is_fresh(now, ttl)),
                Ok(None) => false,
                Err(_) => true,
            };
            if expired && self.store.remove(&key).unwrap_or(false) {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Unconditionally deletes the named entries.
    pub fn invalidate_cache_keys<S: AsRef<str>>(&self, keys: &[S]) {
        for key in keys {
            let key = key.as_ref();
            self.discard(&self.storage_key(key));
            debug!(key, "Invalidated cache entry");
        }
    }

    /// Deletes every entry under the prefix. Returns the number removed.
    pub fn clear_all(&self) -> usize {
        let keys = self.store.keys_with_prefix(&self.prefix).unwrap_or_default();
        keys.iter()
            .filter(|key| self.store.remove(key).unwrap_or(false))
            .count()
    }

    /// Classifies every entry under the prefix against the default ttl.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let ttl = duration_millis(self.default_ttl);
        let mut stats = CacheStats::default();

        for key in self.store.keys_with_prefix(&self.prefix).unwrap_or_default() {
            match self.store.get(&key).ok().flatten().as_deref().map(CacheEntry::parse) {
                Some(Some(entry)) if entry.is_fresh(now, ttl) => stats.fresh += 1,
                Some(Some(_)) => stats.stale += 1,
                Some(None) => stats.corrupt += 1,
                None => {},
            }
        }
        stats
    }

    fn discard(&self, storage_key: &str) {
        if let Err(e) = self.store.remove(storage_key) {
            warn!(key = storage_key, error = %e, "Failed to delete cache entry");
        }
    }
}
