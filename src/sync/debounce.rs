//! Trailing-edge debounce timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Runs at most one pending action after a quiet window.
///
/// Scheduling while an action is pending cancels it and restarts the timer,
/// so a burst collapses to one run of the latest action. Once an action has
/// started it is detached: later schedules and
/// [`cancel_pending`](Self::cancel_pending) never abort it.
///
/// Actions run one at a time, in the order their windows elapsed. An action
/// whose window elapses while an earlier one is still running waits for it
/// and is still cancellable while it waits.
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
    gate: Arc<Mutex<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Schedules `action` to run after the window, replacing any pending one.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel_pending();
        let window = self.window;
        let gate = Arc::clone(&self.gate);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // The mutex queues waiters in FIFO order
            let turn = gate.lock_owned().await;
            tokio::spawn(async move {
                action.await;
                drop(turn);
            });
        }));
    }

    /// Lock held while an action runs. Acquiring it waits out the running
    /// action.
    pub fn gate(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.gate)
    }

    /// Cancels the pending action, if it has not started yet.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether an action is waiting for its window to elapse or for an
    /// earlier action to finish.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
