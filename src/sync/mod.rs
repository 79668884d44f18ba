//! Cart synchronization between the local cart and the server.
//!
//! ## States
//!
//! - **Idle**: no authenticated user
//! - **Bootstrapping**: user present, reconciliation in flight
//! - **Synced**: reconciled; local mutations are pushed after a quiet window
//!
//! ## Reconciliation (once per login)
//!
//! 1. Fetch the server cart.
//! 2. Non-empty server cart: it replaces the local cart (server wins).
//! 3. Empty server cart with local items: push them and adopt the server's
//!    response (local wins). Both empty: adopt the empty cart.
//! 4. Enter `Synced`. Failures are logged and swallowed; the next mutation
//!    retries through the debounced push.
//!
//! ```rust,ignore
//! let handle = CartSync::new(cart, session, backend, Duration::from_millis(500)).spawn();
//! handle.phase().wait_for(SyncPhase::is_synced).await?;
//! ```

mod debounce;
mod process;


pub use debounce::Debouncer;
pub use process::{CartSync, SyncHandle, SyncPhase, SyncStats};
