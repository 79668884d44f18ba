//! The synchronization task and its handle.

use super::Debouncer;
use crate::api::CartApi;
use crate::model::CartLine;
use crate::state::{CartStore, SessionStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Synchronization state for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No authenticated user.
    #[default]
    Idle,
    /// User present, reconciliation in flight.
    Bootstrapping { user_id: i64 },
    /// Reconciled; mutations are pushed on the debounce timer.
    Synced { user_id: i64 },
}

impl SyncPhase {
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }

    pub const fn user_id(&self) -> Option<i64> {
        match self {
            Self::Idle => None,
            Self::Bootstrapping { user_id } | Self::Synced { user_id } => Some(*user_id),
        }
    }
}

/// Counters exposed by [`SyncHandle::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub bootstraps: u64,
    pub bootstrap_failures: u64,
    pub pushes: u64,
    pub push_failures: u64,
}

#[derive(Default)]
struct Counters {
    bootstraps: AtomicU64,
    bootstrap_failures: AtomicU64,
    pushes: AtomicU64,
    push_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            bootstraps: self.bootstraps.load(Ordering::Relaxed),
            bootstrap_failures: self.bootstrap_failures.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
        }
    }
}

/// Reconciles the local cart with the server cart.
///
/// The session store is the only input that moves the state machine; the
/// cart store only feeds the debounced push while `Synced`.
pub struct CartSync {
    cart: CartStore,
    session: SessionStore,
    api: Arc<dyn CartApi>,
    debounce: Duration,
}

impl CartSync {
    pub fn new(
        cart: CartStore,
        session: SessionStore,
        api: Arc<dyn CartApi>,
        debounce: Duration,
    ) -> Self {
        Self {
            cart,
            session,
            api,
            debounce,
        }
    }

    /// Starts the synchronization task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> SyncHandle {
        let (phase_tx, phase_rx) = watch::channel(SyncPhase::Idle);
        let counters = Arc::new(Counters::default());

        // Subscribe before spawning so no change between here and the first
        // poll of the task is missed.
        let session_rx = self.session.subscribe();
        let cart_rx = self.cart.subscribe();

        let debouncer = Debouncer::new(self.debounce);
        let push_gate = debouncer.gate();

        let task = tokio::spawn(self.run(
            session_rx,
            cart_rx,
            debouncer,
            phase_tx,
            Arc::clone(&counters),
        ));

        SyncHandle {
            task,
            phase: phase_rx,
            counters,
            push_gate,
        }
    }

    async fn run(
        self,
        mut session_rx: watch::Receiver<crate::state::Session>,
        mut cart_rx: watch::Receiver<crate::state::CartSnapshot>,
        mut debouncer: Debouncer,
        phase: watch::Sender<SyncPhase>,
        counters: Arc<Counters>,
    ) {

        loop {
            let user = session_rx.borrow_and_update().user_id();

            let Some(user_id) = user else {
                debouncer.cancel_pending();
                if phase.send_replace(SyncPhase::Idle) != SyncPhase::Idle {
                    info!("Cart sync idle");
                }
                if session_rx.changed().await.is_err() {
                    return;
                }
                continue;
            };

            // ---------------------------------------------------------------
            // Bootstrapping
            // ---------------------------------------------------------------
            debouncer.cancel_pending();
            phase.send_replace(SyncPhase::Bootstrapping { user_id });
            debug!(user_id, "Cart sync bootstrapping");

            let bootstrap = self.bootstrap(user_id, &counters);
            tokio::pin!(bootstrap);

            let outcome = loop {
                tokio::select! {
                    unpushed = &mut bootstrap => break Some(unpushed),
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let current = session_rx.borrow().user_id();
                        if current != Some(user_id) {
                            // Dropping the future discards whatever it fetched
                            info!(user_id, "Session changed during bootstrap, discarding result");
                            break None;
                        }
                    },
                }
            };
            let Some(unpushed) = outcome else {
                continue;
            };

            // Hydration is not a user mutation and must not be pushed back
            cart_rx.borrow_and_update();
            phase.send_replace(SyncPhase::Synced { user_id });
            info!(user_id, items = self.cart.items().len(), "Cart synced");

            if unpushed {
                info!(user_id, "Cart changed during bootstrap, scheduling push");
                self.push_later(&mut debouncer, self.cart.snapshot().lines(), &counters);
            }

            // ---------------------------------------------------------------
            // Synced
            // ---------------------------------------------------------------
            loop {
                tokio::select! {
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let current = session_rx.borrow().user_id();
                        if current != Some(user_id) {
                            break;
                        }
                    },
                    changed = cart_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let lines = cart_rx.borrow_and_update().lines();
                        self.push_later(&mut debouncer, lines, &counters);
                    },
                }
            }
        }
    }

    fn push_later(&self, debouncer: &mut Debouncer, lines: Vec<CartLine>, counters: &Arc<Counters>) {
        let api = Arc::clone(&self.api);
        let counters = Arc::clone(counters);
        debouncer.schedule(async move {
            match api.replace_cart(&lines).await {
                Ok(accepted) => {
                    counters.pushes.fetch_add(1, Ordering::Relaxed);
                    debug!(lines = lines.len(), accepted = accepted.len(), "Cart pushed");
                },
                Err(e) => {
                    counters.push_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Cart push failed, will retry on next change");
                },
            }
        });
    }

    /// One reconciliation pass. Failures are logged and swallowed.
    ///
    /// Returns whether the local cart holds changes the server has not
    /// seen: mutations made while the fetch or the push was in flight, or
    /// left behind by a failed fetch.
    async fn bootstrap(&self, user_id: i64, counters: &Counters) -> bool {
        counters.bootstraps.fetch_add(1, Ordering::Relaxed);
        let before = self.cart.snapshot().lines();

        let server_items = match self.api.fetch_cart().await {
            Ok(items) => items,
            Err(e) => {
                counters.bootstrap_failures.fetch_add(1, Ordering::Relaxed);
                warn!(user_id, error = %e, "Failed to fetch server cart, keeping local cart");
                return self.cart.snapshot().lines() != before;
            },
        };

        if !server_items.is_empty() {
            if self.cart.snapshot().lines() != before {
                info!(user_id, "Discarding local changes made during bootstrap, server cart wins");
            }
            info!(user_id, items = server_items.len(), "Adopting server cart");
            self.cart.replace(server_items);
            return false;
        }

        let local = self.cart.snapshot().lines();
        if local.is_empty() {
            debug!(user_id, "Server and local carts are both empty");
            return false;
        }

        match self.api.replace_cart(&local).await {
            Ok(accepted) => {
                if self.cart.snapshot().lines() != local {
                    // The shopper kept editing while the push was in flight;
                    // the newer cart goes out on the debounce timer instead.
                    debug!(user_id, "Local cart changed during push, keeping it");
                    return true;
                }
                info!(user_id, items = accepted.len(), "Pushed local cart to empty server cart");
                self.cart.replace(accepted);
                false
            },
            Err(e) => {
                counters.bootstrap_failures.fetch_add(1, Ordering::Relaxed);
                warn!(user_id, error = %e, "Failed to push local cart, keeping it for the next change");
                self.cart.snapshot().lines() != local
            },
        }
    }
}

/// Handle to a running [`CartSync`] task.
///
/// Dropping the handle stops the task and cancels any pending push.
pub struct SyncHandle {
    task: JoinHandle<()>,
    phase: watch::Receiver<SyncPhase>,
    counters: Arc<Counters>,
    push_gate: Arc<tokio::sync::Mutex<()>>,
}

impl SyncHandle {
    /// Receiver for phase transitions.
    pub fn phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.clone()
    }

    pub fn current_phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Stops the task and waits for it to wind down.
    ///
    /// Pending pushes are cancelled; a push already in flight is allowed to
    /// finish before this returns, so a later push cannot be overtaken by it.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        let _idle = self.push_gate.lock().await;
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
