//! Stored shape of a cached value.

use serde::{Deserialize, Serialize};

/// A cached payload stamped with the instant it was stored.
///
/// The ttl is not stored: validity is decided at read time, so one entry
/// can be fresh for one caller and stale for another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Epoch milliseconds at store time. `None` only for corrupt entries.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// The fetch result.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CacheEntry {
    pub fn new(timestamp: i64, data: serde_json::Value) -> Self {
        Self {
            timestamp: Some(timestamp),
            data,
        }
    }

    /// Parses a stored entry. Unparsable or timestamp-less entries yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let entry: Self = serde_json::from_str(raw).ok()?;
        entry.timestamp?;
        Some(entry)
    }

    /// Whether the entry is still valid for a reader with `ttl_millis`.
    ///
    /// Valid iff `now - timestamp <= ttl`.
    pub fn is_fresh(&self, now_millis: i64, ttl_millis: i64) -> bool {
        self.timestamp
            .is_some_and(|ts| now_millis.saturating_sub(ts) <= ttl_millis)
    }
}
