//! Offline cache maintenance commands.
//!
//! - `storefront cache info` - Count fresh, stale and corrupt entries
//! - `storefront cache sweep` - Remove entries older than the default ttl
//! - `storefront cache clear` - Remove all cached entries
//!
//! These open the store directly rather than the full client, so `info`
//! reports what is on disk before the startup sweep would touch it.

use anyhow::{Context, Result};
use std::sync::Arc;
use storefront::app::open_store;
use storefront::cache::OfflineCache;
use storefront::clock::SystemClock;
use storefront::config::Config;
use storefront::network::AlwaysOnline;

use crate::CacheAction;

pub(crate) fn execute(config: &Config, action: CacheAction) -> Result<()> {
    let store = open_store(config).context("Failed to open local store")?;
    let cache = OfflineCache::new(
        store,
        Arc::new(SystemClock),
        Arc::new(AlwaysOnline),
        config.cache.prefix.clone(),
        config.default_ttl(),
    );

    match action {
        CacheAction::Info => {
            let stats = cache.stats();
            println!("Offline Cache Statistics");
            println!("========================");
            println!("Default ttl: {}s", config.cache.default_ttl_secs);
            println!("Entries:     {}", stats.total());
            println!("  Fresh:     {}", stats.fresh);
            println!("  Stale:     {}", stats.stale);
            println!("  Corrupt:   {}", stats.corrupt);
        },
        CacheAction::Sweep => {
            let removed = cache.clear_expired_cache();
            if removed == 0 {
                println!("No expired entries. Nothing to sweep.");
            } else {
                println!("Removed {removed} expired entries");
            }
        },
        CacheAction::Clear => {
            let removed = cache.clear_all();
            if removed == 0 {
                println!("Cache is already empty.");
            } else {
                println!("Cache cleared successfully");
                println!("  Entries removed: {removed}");
            }
        },
    }

    Ok(())
}
