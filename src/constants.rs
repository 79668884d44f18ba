//! Centralized constants for storage keys, windows and defaults.
//!
//! All magic numbers in the client should be defined here with a short
//! rationale so that tuning does not require a code search.

use std::time::Duration;

// =============================================================================
// Persistent Store Keys
// =============================================================================

/// Namespace prefix for every TTL-cached read.
pub const CACHE_PREFIX: &str = "offline_cache_";

/// Key holding the authenticated session (user + token).
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// Key holding the local cart (items + persist timestamp).
pub const CART_STORAGE_KEY: &str = "cart-storage";

// =============================================================================
// Cache Defaults
// =============================================================================

/// Default time-to-live for cached reads (10 minutes).
/// Also the fixed window used by the start-up sweep.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

// =============================================================================
// Cart Defaults
// =============================================================================

/// Local-only cart data older than this is discarded on load (7 days).
pub const DEFAULT_CART_EXPIRATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Quiescence window before a cart mutation is pushed to the server.
pub const CART_SYNC_DEBOUNCE: Duration = Duration::from_millis(500);

/// Lower bound for any cart line quantity.
pub const MIN_QUANTITY: u32 = 1;

// =============================================================================
// Backend Defaults
// =============================================================================

/// Default REST backend base URL (local development).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding the configured backend base URL.
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

/// Default per-request timeout against the backend.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default health path polled by the connectivity probe.
pub const DEFAULT_PROBE_PATH: &str = "/health";

/// Default interval between connectivity probes.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

/// Timeout for a single connectivity probe.
/// Short so that a dead network flips the status quickly.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
