//! Connectivity status for offline-aware reads.
//!
//! The TTL cache consults a [`NetworkStatus`] before fetching. Three
//! implementations are provided:
//!
//! - [`AlwaysOnline`]: never reports offline
//! - [`ManualNetwork`]: toggled explicitly (tests, embedding UIs)
//! - [`ProbedNetwork`]: polls a backend health path on an interval

use crate::constants::PROBE_TIMEOUT;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Reports whether the runtime currently has connectivity.
pub trait NetworkStatus: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Shared handle to a connectivity source.
pub type SharedNetwork = Arc<dyn NetworkStatus>;

/// Connectivity source that is always online.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl NetworkStatus for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Connectivity flag flipped by the caller.
#[derive(Debug)]
pub struct ManualNetwork {
    online: AtomicBool,
}

impl ManualNetwork {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ManualNetwork {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkStatus for ManualNetwork {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Connectivity inferred from periodic HTTP probes against the backend.
///
/// Starts optimistic (online) and flips after each probe. Any response,
/// including an error status, counts as connectivity: only transport
/// failures mean offline.
pub struct ProbedNetwork {
    online: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ProbedNetwork {
    /// Spawns the probe loop. Must be called inside a tokio runtime.
    pub fn spawn(url: String, interval: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .pool_max_idle_per_host(1)
            .build()?;

        let online = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&online);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let reachable = match client.get(&url).send().await {
                    Ok(response) => {
                        debug!(url = %url, status = %response.status(), "Connectivity probe answered");
                        true
                    },
                    Err(e) => {
                        debug!(url = %url, error = %e, "Connectivity probe failed");
                        false
                    },
                };

                let was_online = flag.swap(reachable, Ordering::SeqCst);
                if was_online && !reachable {
                    warn!(url = %url, "Backend unreachable, serving cached data where possible");
                } else if !was_online && reachable {
                    info!(url = %url, "Backend reachable again");
                }
            }
        });

        Ok(Self { online, task })
    }
}

impl NetworkStatus for ProbedNetwork {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl Drop for ProbedNetwork {
    fn drop(&mut self) {
        self.task.abort();
    }
}
