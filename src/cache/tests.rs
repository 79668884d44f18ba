//! Tests for the offline cache.

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::network::ManualNetwork;
use crate::storage::{KvBackend, MemoryBackend};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(600);

struct Fixture {
    store: Arc<MemoryBackend>,
    clock: Arc<ManualClock>,
    network: Arc<ManualNetwork>,
    cache: OfflineCache,
}

fn fixture_with_store(store: Arc<MemoryBackend>) -> Fixture {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let network = Arc::new(ManualNetwork::new(true));
    let cache = OfflineCache::new(
        store.clone(),
        clock.clone(),
        network.clone(),
        "offline_cache_",
        TTL,
    );
    Fixture {
        store,
        clock,
        network,
        cache,
    }
}

fn fixture() -> Fixture {
    fixture_with_store(Arc::new(MemoryBackend::new()))
}

async fn ok_fetch(value: &str) -> Result<Vec<String>, String> {
    Ok(vec![value.to_string()])
}

async fn failing_fetch() -> Result<Vec<String>, String> {
    Err("connection refused".to_string())
}

#[tokio::test]
async fn test_successful_fetch_is_written_through() {
    let f = fixture();

    let first = f
        .cache
        .fetch_with_cache("products", || ok_fetch("laptop"), TTL, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first, vec!["laptop"]);

    // A failing producer now falls back to the stored value
    let second = f
        .cache
        .fetch_with_cache("products", failing_fetch, TTL, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(second, vec!["laptop"]);

    let raw = f.store.get("offline_cache_products").unwrap().unwrap();
    let entry = CacheEntry::parse(&raw).unwrap();
    assert_eq!(entry.timestamp, Some(f.clock.now_millis()));
}

#[tokio::test]
async fn test_offline_with_valid_entry_never_calls_fetcher() {
    let f = fixture();
    f.cache.write_cached("categories", &vec!["audio".to_string()]);
    f.network.set_online(false);

    let calls = AtomicUsize::new(0);
    let value: Vec<String> = f
        .cache
        .fetch_with_cache(
            "categories",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok_fetch("fresh")
            },
            TTL,
            FetchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(value, vec!["audio"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_offline_without_entry_still_fetches() {
    let f = fixture();
    f.network.set_online(false);

    let value = f
        .cache
        .fetch_with_cache("roles", || ok_fetch("admin"), TTL, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(value, vec!["admin"]);
}

#[tokio::test]
async fn test_failure_without_cache_propagates_original_error() {
    let f = fixture();

    let err = f
        .cache
        .fetch_with_cache("products", failing_fetch, TTL, FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, "connection refused");
}

#[tokio::test]
async fn test_no_fallback_propagates_even_with_cache() {
    let f = fixture();
    f.cache.write_cached("products", &vec!["laptop".to_string()]);

    let err = f
        .cache
        .fetch_with_cache("products", failing_fetch, TTL, FetchOptions::no_fallback())
        .await
        .unwrap_err();
    assert_eq!(err, "connection refused");
}

#[tokio::test]
async fn test_ttl_boundary() {
    let f = fixture();
    f.cache.write_cached("sales_history", &vec!["q1".to_string()]);

    f.clock.advance(TTL - Duration::from_millis(1));
    assert_eq!(
        f.cache.read_cached::<Vec<String>>("sales_history", TTL),
        Some(vec!["q1".to_string()])
    );

    // Exactly at ttl is still valid
    f.clock.advance(Duration::from_millis(1));
    assert!(f.cache.read_cached::<Vec<String>>("sales_history", TTL).is_some());

    f.clock.advance(Duration::from_millis(1));
    assert!(f.cache.read_cached::<Vec<String>>("sales_history", TTL).is_none());
    // Expired reads delete the entry
    assert!(f.store.get("offline_cache_sales_history").unwrap().is_none());
}

#[tokio::test]
async fn test_expired_entry_is_not_a_fallback() {
    let f = fixture();
    f.cache.write_cached("products", &vec!["old".to_string()]);
    f.clock.advance(TTL + Duration::from_secs(1));

    let err = f
        .cache
        .fetch_with_cache("products", failing_fetch, TTL, FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, "connection refused");
}

#[test]
fn test_ttl_is_a_read_time_parameter() {
    let f = fixture();
    f.cache.write_cached("products", &1_u32);
    f.clock.advance(Duration::from_secs(120));

    assert_eq!(
        f.cache.read_cached::<u32>("products", Duration::from_secs(300)),
        Some(1)
    );
    // A shorter-ttl reader sees it as stale and drops it
    assert_eq!(f.cache.read_cached::<u32>("products", Duration::from_secs(60)), None);
    assert_eq!(f.cache.read_cached::<u32>("products", Duration::from_secs(300)), None);
}

#[test]
fn test_corrupt_entry_is_a_miss_and_deleted() {
    let f = fixture();
    f.store.set("offline_cache_products", "{not json").unwrap();

    assert_eq!(f.cache.read_cached::<Vec<String>>("products", TTL), None);
    assert!(f.store.get("offline_cache_products").unwrap().is_none());
}

#[test]
fn test_missing_timestamp_is_a_miss_and_deleted() {
    let f = fixture();
    f.store
        .set("offline_cache_products", r#"{"data":["laptop"]}"#)
        .unwrap();

    assert_eq!(f.cache.read_cached::<Vec<String>>("products", TTL), None);
    assert!(f.store.get("offline_cache_products").unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_entry_behaves_like_missing_key() {
    let f = fixture();
    f.store.set("offline_cache_products", "garbage").unwrap();

    let err = f
        .cache
        .fetch_with_cache("products", failing_fetch, TTL, FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, "connection refused");
}

#[test]
fn test_sweep_removes_expired_and_corrupt_only() {
    let f = fixture();
    f.cache.write_cached("old", &1_u32);
    f.clock.advance(TTL + Duration::from_secs(1));
    f.cache.write_cached("fresh", &2_u32);
    f.store.set("offline_cache_broken", "nope").unwrap();
    f.store.set("offline_cache_no_ts", r#"{"data":3}"#).unwrap();
    f.store.set("cart-storage", "nope").unwrap();

    let removed = f.cache.clear_expired_cache();
    assert_eq!(removed, 3);

    let remaining = f.store.keys_with_prefix("offline_cache_").unwrap();
    assert_eq!(remaining, vec!["offline_cache_fresh"]);
    // Keys outside the namespace are untouched
    assert!(f.store.get("cart-storage").unwrap().is_some());
}

#[test]
fn test_sweep_uses_default_ttl_not_callers_ttl() {
    let f = fixture();
    f.cache.write_cached("sales_history", &vec![1, 2, 3]);
    f.clock.advance(TTL + Duration::from_secs(60));

    // Still valid for a caller reading with a one-hour ttl...
    let long_ttl = Duration::from_secs(3600);
    assert!(f.cache.read_cached::<Vec<i32>>("sales_history", long_ttl).is_some());

    // ...but the sweep judges it by the default window
    assert_eq!(f.cache.clear_expired_cache(), 1);
    assert!(f.cache.read_cached::<Vec<i32>>("sales_history", long_ttl).is_none());
}

#[test]
fn test_invalidate_removes_named_keys() {
    let f = fixture();
    f.cache.write_cached("products", &1_u32);
    f.cache.write_cached("categories", &2_u32);
    f.cache.write_cached("roles", &3_u32);

    f.cache.invalidate_cache_keys(&["products", "categories", "never-cached"]);

    assert!(f.cache.read_cached::<u32>("products", TTL).is_none());
    assert!(f.cache.read_cached::<u32>("categories", TTL).is_none());
    assert_eq!(f.cache.read_cached::<u32>("roles", TTL), Some(3));
}

#[tokio::test]
async fn test_quota_failure_sweeps_and_does_not_retry() {
    let store = Arc::new(MemoryBackend::with_quota(200));
    let f = fixture_with_store(store);

    f.cache.write_cached("old", &"x".repeat(60));
    f.clock.advance(TTL + Duration::from_secs(1));

    // Too large to fit alongside the expired entry
    let big = "y".repeat(150);
    let value = f
        .cache
        .fetch_with_cache("big", || async { Ok::<_, String>(big.clone()) }, TTL, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(value, big);

    // The sweep freed the expired entry, but the write was not retried
    assert!(f.store.get("offline_cache_old").unwrap().is_none());
    assert!(f.store.get("offline_cache_big").unwrap().is_none());
}

#[test]
fn test_stats_and_clear_all() {
    let f = fixture();
    f.cache.write_cached("a", &1_u32);
    f.clock.advance(TTL + Duration::from_secs(1));
    f.cache.write_cached("b", &2_u32);
    f.store.set("offline_cache_c", "broken").unwrap();

    let stats = f.cache.stats();
    assert_eq!(
        stats,
        CacheStats {
            fresh: 1,
            stale: 1,
            corrupt: 1
        }
    );
    assert_eq!(stats.total(), 3);

    assert_eq!(f.cache.clear_all(), 3);
    assert_eq!(f.cache.stats().total(), 0);
}

proptest! {
    /// Invariant: a value is returned unchanged within ttl and is a miss after.
    #[test]
    fn ttl_window_holds(ttl_ms in 1u64..=86_400_000, epsilon in 1u64..=10_000, value in any::<i64>()) {
        let ttl = Duration::from_millis(ttl_ms);
        let f = fixture();
        f.cache.write_cached("k", &value);

        f.clock.advance(ttl - Duration::from_millis(epsilon.min(ttl_ms)));
        prop_assert_eq!(f.cache.read_cached::<i64>("k", ttl), Some(value));

        f.clock.advance(Duration::from_millis(epsilon.min(ttl_ms) + epsilon));
        prop_assert_eq!(f.cache.read_cached::<i64>("k", ttl), None);
    }
}
