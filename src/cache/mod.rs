//! Offline-aware TTL cache for read-only backend fetches.
//!
//! Wraps any asynchronous read with a timestamped entry in the persistent
//! store. Stale data is served when the runtime is offline or when the live
//! fetch fails; mutations are never cached and explicitly invalidate the
//! reads they affect.
//!
//! ```rust,ignore
//! let products: Vec<Product> = cache
//!     .fetch_with_cache("products", || api.list_products(), DEFAULT_CACHE_TTL, FetchOptions::default())
//!     .await?;
//! ```

mod entry;
mod offline;

#[cfg(test)]
mod tests;

pub use entry::CacheEntry;
pub use offline::{CacheStats, OfflineCache};

/// Per-call behavior of [`OfflineCache::fetch_with_cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Serve a valid cached value when the fetch fails.
    pub fallback_on_error: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            fallback_on_error: true,
        }
    }
}

impl FetchOptions {
    /// Options that propagate every fetch failure.
    pub const fn no_fallback() -> Self {
        Self {
            fallback_on_error: false,
        }
    }
}
