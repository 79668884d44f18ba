// =============================================================================
// Lint Configuration
// =============================================================================

#![deny(unsafe_code)]
// Correctness: Must handle all fallible operations
#![deny(unused_must_use)]
// Quality: Pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![allow(missing_debug_implementations)] // Stores hold trait objects without Debug

// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::missing_panics_doc)] // Panics documented in main entry points
#![allow(clippy::module_name_repetitions)] // e.g., cache::CacheEntry is clearer
#![allow(clippy::doc_markdown)] // Too many false positives in code docs
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::cast_possible_truncation)] // Millisecond timestamps fit in i64
#![allow(clippy::cast_precision_loss)] // Quantities in price arithmetic are small

//! Offline-aware storefront client core.
//!
//! The crate is the client half of a storefront: everything between the
//! shopper's screen and the REST backend that is worth testing on its own.
//!
//! - [`cache`] wraps backend reads in a TTL cache over a persistent
//!   key-value store, serving stale-but-valid data offline or on failure.
//! - [`state`] holds the session and cart as observable stores.
//! - [`sync`] reconciles the local cart with the server cart after login
//!   and pushes later changes on a debounce timer.
//! - [`assistant`] turns free-text instructions ("agregar laptop 2") into
//!   cart mutations.
//! - [`app::Storefront`] wires all of it over a [`config::Config`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use storefront::clock::ManualClock;
//! use storefront::state::CartStore;
//! use storefront::storage::MemoryBackend;
//! use storefront::assistant::{CommandInterpreter, Outcome};
//! use std::time::Duration;
//!
//! let cart = CartStore::load(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(ManualClock::new(0)),
//!     "cart-storage",
//!     Duration::from_secs(3600),
//! );
//! let mut interpreter = CommandInterpreter::standard(cart.clone()).unwrap();
//!
//! assert_eq!(interpreter.interpret("vaciar carrito", &[]), Outcome::Cleared);
//! assert!(cart.is_empty());
//! ```

/// Persistent key-value store backends.
pub mod storage;

/// Time source seam.
pub mod clock;

/// Connectivity seam and the health-probe implementation.
pub mod network;

/// TTL request cache over the persistent store.
///
/// See [`cache::OfflineCache::fetch_with_cache`] for the fallback rules.
pub mod cache;

/// Records exchanged with the backend.
pub mod model;

/// Typed backend client.
pub mod api;

/// Cached catalog reads and write-side invalidation.
pub mod catalog;

/// Session and cart stores.
pub mod state;

/// Cart synchronization with the server.
pub mod sync;

/// Free-text cart command interpreter.
pub mod assistant;

/// Composition root.
pub mod app;

/// Centralized constants with documented defaults.
pub mod constants;

/// Configuration loaded from TOML.
///
/// # Example
///
/// ```
/// use storefront::config::Config;
///
/// let toml = r#"
/// [backend]
/// base_url = "https://shop.example.com/api"
///
/// [cart]
/// sync_debounce_ms = 250
/// "#;
///
/// let config: Config = toml::from_str(toml).unwrap();
/// assert!(config.validate().is_ok());
/// ```
pub mod config;

/// Crate error type.
pub mod error;

/// Subscriber setup for binaries.
pub mod logging;

pub use app::Storefront;
pub use error::{Error, Result};
