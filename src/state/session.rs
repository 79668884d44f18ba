//! Session store: authenticated identity and bearer token.

use crate::api::{ApiClient, AuthApi};
use crate::model::User;
use crate::storage::SharedStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Current identity. `user` and `token` are set and cleared together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Observable session container.
///
/// On every change the token is propagated to the shared [`ApiClient`]
/// and the session is persisted under its storage key.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
    store: SharedStore,
    key: String,
    client: ApiClient,
}

impl SessionStore {
    /// Rehydrates the persisted session.
    ///
    /// A persisted token is installed on `client` before this returns, so
    /// the first authenticated request after a restart carries it. A
    /// half-populated or unreadable record is discarded.
    pub fn load(store: SharedStore, key: impl Into<String>, client: ApiClient) -> Self {
        let key = key.into();
        let session = match store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) if session.is_authenticated() => session,
                Ok(_) => Session::default(),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted session");
                    Session::default()
                },
            },
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                Session::default()
            },
        };

        client.set_bearer_token(session.token.clone());
        if let Some(user) = &session.user {
            debug!(user_id = user.id, "Rehydrated session");
        }

        let (tx, _rx) = watch::channel(session);
        Self {
            tx: Arc::new(tx),
            store,
            key,
            client,
        }
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Stores both fields, persists them and installs the bearer token.
    pub fn set_session(&self, user: User, token: String) {
        info!(user_id = user.id, username = %user.username, "Session started");
        self.apply(Session {
            user: Some(user),
            token: Some(token),
        });
    }

    /// Clears both fields, persists the clear and removes the bearer token.
    pub fn clear_session(&self) {
        if self.tx.borrow().user.is_some() {
            info!("Session cleared");
        }
        self.apply(Session::default());
    }

    /// Confirms the session against "who am I".
    ///
    /// On success the user record is refreshed. On any failure the session
    /// is cleared; it never continues with a token the backend rejected.
    pub async fn revalidate(&self, auth: &dyn AuthApi) -> bool {
        let Some(token) = self.tx.borrow().token.clone() else {
            return false;
        };

        match auth.me().await {
            Ok(user) => {
                debug!(user_id = user.id, "Session revalidated");
                self.apply(Session {
                    user: Some(user),
                    token: Some(token),
                });
                true
            },
            Err(e) => {
                warn!(error = %e, "Session revalidation failed, logging out");
                self.clear_session();
                false
            },
        }
    }

    fn apply(&self, session: Session) {
        self.client.set_bearer_token(session.token.clone());
        self.persist(&session);
        self.tx.send_replace(session);
    }

    fn persist(&self, session: &Session) {
        let result = if session.is_authenticated() {
            serde_json::to_string(session)
                .map_err(|e| e.to_string())
                .and_then(|raw| self.store.set(&self.key, &raw).map_err(|e| e.to_string()))
        } else {
            self.store.remove(&self.key).map(|_| ()).map_err(|e| e.to_string())
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }
}
