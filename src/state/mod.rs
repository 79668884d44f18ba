//! Shared client state: the session and the cart.
//!
//! Both stores are explicit containers injected into their consumers. Each
//! is a cheap `Clone` handle over shared state, persists through the
//! persistent store after every change, and publishes snapshots over a
//! `tokio::sync::watch` channel so that observers (the sync process, a UI)
//! can subscribe without polling.

pub mod cart;
pub mod session;

pub use cart::{CartSnapshot, CartStore};
pub use session::{Session, SessionStore};
