//! Cart store: line items for the current client, independent of login.

use crate::clock::{SharedClock, duration_millis};
use crate::constants::MIN_QUANTITY;
use crate::model::{CartItem, CartLine, Product, ProductId};
use crate::storage::SharedStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Persisted and published shape of the cart.
///
/// `items` is in insertion order, which is also display order, and holds
/// at most one line per product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    /// Epoch milliseconds of the last local persist.
    #[serde(default)]
    pub timestamp: i64,
}

impl CartSnapshot {
    pub fn lines(&self) -> Vec<CartLine> {
        self.items.iter().map(CartLine::from).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Observable cart container.
///
/// Every mutation persists `{items, timestamp}` and notifies subscribers.
/// Mutations that change nothing (removing an absent product, clearing an
/// empty cart) do not notify.
#[derive(Clone)]
pub struct CartStore {
    tx: Arc<watch::Sender<CartSnapshot>>,
    store: SharedStore,
    clock: SharedClock,
    key: String,
}

impl CartStore {
    /// Loads the persisted cart, discarding it when older than `expiration`
    /// or unreadable.
    pub fn load(
        store: SharedStore,
        clock: SharedClock,
        key: impl Into<String>,
        expiration: Duration,
    ) -> Self {
        let key = key.into();
        let now = clock.now_millis();

        let snapshot = match store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<CartSnapshot>(&raw) {
                Ok(snapshot) if now.saturating_sub(snapshot.timestamp) <= duration_millis(expiration) => {
                    debug!(items = snapshot.items.len(), "Loaded local cart");
                    normalize(snapshot)
                },
                Ok(_) => {
                    debug!("Local cart expired, starting empty");
                    let _ = store.remove(&key);
                    CartSnapshot::default()
                },
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable local cart");
                    let _ = store.remove(&key);
                    CartSnapshot::default()
                },
            },
            Ok(None) => CartSnapshot::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read local cart");
                CartSnapshot::default()
            },
        };

        let (tx, _rx) = watch::channel(snapshot);
        Self {
            tx: Arc::new(tx),
            store,
            clock,
            key,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.tx.borrow().clone()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.tx.borrow().items.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().items.is_empty()
    }

    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.tx
            .borrow()
            .items
            .iter()
            .find(|i| i.product.id == product_id)
            .map(|i| i.quantity)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.tx.borrow().items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals at effective (discounted) prices.
    pub fn subtotal(&self) -> f64 {
        self.tx.borrow().items.iter().map(CartItem::line_total).sum()
    }

    /// Adds `quantity` of `product`, merging into an existing line.
    pub fn add_item(&self, product: Product, quantity: u32) {
        let quantity = quantity.max(MIN_QUANTITY);
        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.product.id == product.id) {
                item.quantity = item.quantity.saturating_add(quantity);
                // Keep the freshest snapshot of price and stock
                item.product = product;
            } else {
                items.push(CartItem { product, quantity });
            }
            true
        });
    }

    /// Removes the line for `product_id`. Returns whether it existed.
    pub fn remove_item(&self, product_id: ProductId) -> bool {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.product.id != product_id);
            items.len() != before
        })
    }

    /// Sets the quantity of an existing line; values below 1 become 1.
    pub fn update_quantity(&self, product_id: ProductId, quantity: u32) -> bool {
        let quantity = quantity.max(MIN_QUANTITY);
        self.mutate(|items| {
            items
                .iter_mut()
                .find(|i| i.product.id == product_id)
                .is_some_and(|item| {
                    item.quantity = quantity;
                    true
                })
        })
    }

    /// Empties the cart.
    pub fn clear(&self) {
        self.mutate(|items| {
            let changed = !items.is_empty();
            items.clear();
            changed
        });
    }

    /// Replaces the cart wholesale, e.g. with the server's cart.
    pub fn replace(&self, items: Vec<CartItem>) {
        self.mutate(|current| {
            *current = dedupe(items);
            true
        });
    }

    /// Applies `f`; persists and notifies when it reports a change.
    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Vec<CartItem>) -> bool,
    {
        let now = self.clock.now_millis();
        let mut snapshot = None;

        let changed = self.tx.send_if_modified(|cart| {
            if f(&mut cart.items) {
                cart.timestamp = now;
                snapshot = Some(cart.clone());
                true
            } else {
                false
            }
        });

        if let Some(snapshot) = snapshot {
            self.persist(&snapshot);
        }
        changed
    }

    fn persist(&self, snapshot: &CartSnapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.set(&self.key, &raw).map_err(|e| e.to_string()));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Enforces the cart invariants on data read from outside.
fn normalize(mut snapshot: CartSnapshot) -> CartSnapshot {
    snapshot.items = dedupe(snapshot.items);
    snapshot
}

/// Merges duplicate product lines (first position wins) and floors quantities.
fn dedupe(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(items.len());
    for mut item in items {
        item.quantity = item.quantity.max(MIN_QUANTITY);
        if let Some(existing) = out.iter_mut().find(|i| i.product.id == item.product.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            out.push(item);
        }
    }
    out
}
