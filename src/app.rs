//! Composition root wiring storage, backend, stores and sync together.

use crate::api::{AdminApi, ApiClient, AuthApi, CartApi, CheckoutApi, HttpBackend};
use crate::assistant::CommandInterpreter;
use crate::cache::OfflineCache;
use crate::catalog::CatalogService;
use crate::clock::{SharedClock, SystemClock};
use crate::config::{Config, StorageKind};
use crate::model::{CheckoutSession, Registration, User};
use crate::network::{AlwaysOnline, ProbedNetwork, SharedNetwork};
use crate::state::{CartStore, SessionStore};
use crate::storage::{MemoryBackend, RedbBackend, SharedStore};
use crate::sync::{CartSync, SyncHandle};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Opens the configured persistent store.
pub fn open_store(config: &Config) -> Result<SharedStore> {
    let store: SharedStore = match config.storage.backend {
        StorageKind::Redb => Arc::new(RedbBackend::open(config.storage_path()?)?),
        StorageKind::Memory => match config.storage.quota_bytes {
            Some(quota) => Arc::new(MemoryBackend::with_quota(quota)),
            None => Arc::new(MemoryBackend::new()),
        },
    };
    Ok(store)
}

/// A running storefront client.
///
/// Everything here is a cheap handle over shared state; the session and
/// cart stores are the single sources of truth for their data.
pub struct Storefront {
    config: Config,
    store: SharedStore,
    cache: OfflineCache,
    backend: Arc<HttpBackend>,
    session: SessionStore,
    cart: CartStore,
    catalog: CatalogService,
}

impl Storefront {
    /// Opens the configured store and builds the client.
    ///
    /// Must be called inside a tokio runtime when connectivity probing is
    /// enabled.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config)?;

        let network: SharedNetwork = if config.network.probe_enabled {
            Arc::new(ProbedNetwork::spawn(config.probe_url(), config.probe_interval())?)
        } else {
            Arc::new(AlwaysOnline)
        };

        Self::with_parts(config, store, Arc::new(SystemClock), network)
    }

    /// Builds the client over explicit seams.
    ///
    /// Startup order matters: the expired-cache sweep runs first, then the
    /// session is rehydrated so its bearer token is installed before any
    /// request can be made.
    pub fn with_parts(
        config: Config,
        store: SharedStore,
        clock: SharedClock,
        network: SharedNetwork,
    ) -> Result<Self> {
        config.validate()?;

        let cache = OfflineCache::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            network,
            config.cache.prefix.clone(),
            config.default_ttl(),
        );
        let swept = cache.clear_expired_cache();
        if swept > 0 {
            info!(swept, "Removed expired cache entries");
        }

        let client = ApiClient::new(&config.backend.base_url, config.request_timeout())?;
        let backend = Arc::new(HttpBackend::new(client.clone()));

        let session = SessionStore::load(
            Arc::clone(&store),
            config.session.storage_key.clone(),
            client,
        );
        let cart = CartStore::load(
            Arc::clone(&store),
            clock,
            config.cart.storage_key.clone(),
            config.cart_expiration(),
        );
        let catalog = CatalogService::new(cache.clone(), backend.clone(), backend.clone());

        info!(
            base_url = %config.backend.base_url,
            authenticated = session.is_authenticated(),
            cart_items = cart.items().len(),
            "Storefront ready"
        );

        Ok(Self {
            config,
            store,
            cache,
            backend,
            session,
            cart,
            catalog,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub const fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub const fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Administrative endpoints (users, invoices, reports, ...).
    pub fn admin(&self) -> &dyn AdminApi {
        self.backend.as_ref()
    }

    pub fn backend(&self) -> &Arc<HttpBackend> {
        &self.backend
    }

    /// A fresh interpreter writing to this client's cart.
    pub fn interpreter(&self) -> Result<CommandInterpreter> {
        CommandInterpreter::standard(self.cart.clone())
    }

    /// Starts background cart synchronization. Must be called inside a
    /// tokio runtime; dropping the handle stops it.
    pub fn start_sync(&self) -> SyncHandle {
        CartSync::new(
            self.cart.clone(),
            self.session.clone(),
            self.backend.clone(),
            self.config.sync_debounce(),
        )
        .spawn()
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let response = self.backend.login(username, password).await?;
        self.session
            .set_session(response.user.clone(), response.token);
        Ok(response.user)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let response = self.backend.register(registration).await?;
        self.session
            .set_session(response.user.clone(), response.token);
        Ok(response.user)
    }

    /// Ends the session. The local session is cleared even when the backend
    /// call fails; the cart is kept.
    pub async fn logout(&self) {
        if self.session.is_authenticated()
            && let Err(e) = self.backend.logout().await
        {
            warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }
        self.session.clear_session();
    }

    /// Checks the persisted session against the backend, clearing it when
    /// the backend no longer accepts it.
    pub async fn revalidate_session(&self) -> bool {
        self.session.revalidate(self.backend.as_ref()).await
    }

    /// Replaces the server cart with the local cart right away.
    ///
    /// Used where the debounce timer would not get to fire, such as right
    /// before the process exits. Does nothing without a session.
    pub async fn push_cart(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            return Ok(());
        }
        let lines = self.cart.snapshot().lines();
        let accepted = self.backend.replace_cart(&lines).await?;
        info!(lines = lines.len(), accepted = accepted.len(), "Cart pushed");
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Creates a payment session for the current cart.
    ///
    /// The cart is left untouched; clearing it after payment is up to the
    /// caller.
    pub async fn execute_checkout(&self) -> Result<CheckoutSession> {
        if !self.session.is_authenticated() {
            return Err(Error::Unauthenticated);
        }
        let lines = self.cart.snapshot().lines();
        if lines.is_empty() {
            return Err(Error::InvalidInput("cart is empty".to_string()));
        }
        let session = self.backend.create_checkout_session(&lines).await?;
        info!(session_id = %session.id, lines = lines.len(), "Checkout session created");
        Ok(session)
    }
}
