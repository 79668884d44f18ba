//! Instruction resolution against the catalog and the cart.

use super::normalize::normalize;
use super::rules::{Intent, RuleSet};
use crate::constants::MIN_QUANTITY;
use crate::model::Product;
use crate::state::CartStore;
use std::fmt::Write as _;
use tracing::debug;

/// A disambiguation waiting for [`CommandInterpreter::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub intent: Intent,
    pub candidates: Vec<Product>,
    /// Quantity to apply on selection (add only).
    pub quantity: u32,
}

/// Result of interpreting one instruction or selection.
///
/// None of these are errors: every outcome is a user-facing report and the
/// cart is only modified for `Added`, `Removed` and `Cleared`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Added { product: Product, quantity: u32 },
    Removed { product: Product },
    Cleared,
    /// The caller should start a checkout session for the current cart.
    CheckoutRequested,
    /// Checkout was asked for with nothing in the cart.
    EmptyCart,
    /// Several candidates matched; one must be picked with `select`.
    Ambiguous { intent: Intent, candidates: Vec<Product> },
    /// Add or remove without any product text.
    MissingTarget { intent: Intent },
    NotFound { intent: Intent, query: String },
    InvalidSelection { index: usize, available: usize },
    Unrecognized { keywords: Vec<String> },
}

impl Outcome {
    /// Whether the cart was modified.
    pub const fn mutated_cart(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Removed { .. } | Self::Cleared)
    }

    /// Message shown to the shopper.
    pub fn message(&self) -> String {
        match self {
            Self::Added { product, quantity } => {
                format!("Agregado al carrito: {quantity} x {}", product.name)
            },
            Self::Removed { product } => format!("Eliminado del carrito: {}", product.name),
            Self::Cleared => "Carrito vaciado".to_string(),
            Self::CheckoutRequested => "Iniciando el pago...".to_string(),
            Self::EmptyCart => "El carrito está vacío".to_string(),
            Self::Ambiguous { candidates, .. } => {
                let mut out = String::from("Encontré varios productos:");
                for (i, product) in candidates.iter().enumerate() {
                    let _ = write!(out, " {}) {}", i + 1, product.name);
                }
                out.push_str(". ¿Cuál quieres?");
                out
            },
            Self::MissingTarget { intent } => match intent {
                Intent::Remove => "¿Qué producto quieres quitar?".to_string(),
                _ => "¿Qué producto quieres agregar?".to_string(),
            },
            Self::NotFound { intent, query } => match intent {
                Intent::Remove => format!("No hay productos en el carrito que coincidan con \"{query}\""),
                _ => format!("No encontré productos que coincidan con \"{query}\""),
            },
            Self::InvalidSelection { available, .. } => {
                if *available == 0 {
                    "No hay ninguna selección pendiente".to_string()
                } else {
                    format!("Selección no válida; elige un número entre 1 y {available}")
                }
            },
            Self::Unrecognized { keywords } => format!(
                "No entendí el comando. Prueba con: {}",
                keywords.join(", ")
            ),
        }
    }
}

/// Turns free-text instructions into cart mutations.
///
/// At most one disambiguation is pending at a time; any new instruction
/// discards it.
pub struct CommandInterpreter {
    rules: RuleSet,
    cart: CartStore,
    pending: Option<PendingAction>,
}

impl CommandInterpreter {
    pub const fn new(rules: RuleSet, cart: CartStore) -> Self {
        Self {
            rules,
            cart,
            pending: None,
        }
    }

    /// Interpreter with the built-in keyword table.
    pub fn standard(cart: CartStore) -> crate::Result<Self> {
        let rules = RuleSet::standard()
            .map_err(|e| crate::Error::config(format!("invalid keyword table: {e}")))?;
        Ok(Self::new(rules, cart))
    }

    pub const fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Interprets one instruction against `catalog`.
    pub fn interpret(&mut self, instruction: &str, catalog: &[Product]) -> Outcome {
        self.pending = None;

        let normalized = normalize(instruction);
        let Some(command) = self.rules.classify(&normalized) else {
            debug!(instruction = %normalized, "Unrecognized instruction");
            return Outcome::Unrecognized {
                keywords: self.rules.primary_keywords(),
            };
        };
        debug!(intent = %command.intent, target = %command.target, "Classified instruction");

        if command.intent.needs_target() && command.target.is_empty() {
            return Outcome::MissingTarget {
                intent: command.intent,
            };
        }

        match command.intent {
            Intent::Add => self.add(&command.target, catalog),
            Intent::Remove => self.remove(&command.target),
            Intent::Clear => {
                self.cart.clear();
                Outcome::Cleared
            },
            Intent::Checkout => {
                if self.cart.is_empty() {
                    Outcome::EmptyCart
                } else {
                    Outcome::CheckoutRequested
                }
            },
        }
    }

    /// Applies the pending disambiguation. `index` is zero-based.
    ///
    /// An out-of-range index keeps the pending state so the shopper can
    /// try again.
    pub fn select(&mut self, index: usize) -> Outcome {
        let Some(pending) = self.pending.as_ref() else {
            return Outcome::InvalidSelection {
                index,
                available: 0,
            };
        };
        let Some(product) = pending.candidates.get(index).cloned() else {
            return Outcome::InvalidSelection {
                index,
                available: pending.candidates.len(),
            };
        };

        let intent = pending.intent;
        let quantity = pending.quantity;
        self.pending = None;

        match intent {
            Intent::Remove => self.apply_remove(product),
            _ => self.apply_add(product, quantity),
        }
    }

    fn add(&mut self, target: &str, catalog: &[Product]) -> Outcome {
        let (search, quantity) = self.rules.split_quantity(target);
        // Digits-only text ("agregar 2") searches with the digits themselves
        // so products named by number stay reachable.
        let search = if search.is_empty() { target } else { search };
        let quantity = quantity.unwrap_or(MIN_QUANTITY).max(MIN_QUANTITY);

        match resolve(search, catalog.iter()) {
            Resolution::One(product) => self.apply_add(product, quantity),
            Resolution::Many(candidates) => self.defer(Intent::Add, candidates, quantity),
            Resolution::None => Outcome::NotFound {
                intent: Intent::Add,
                query: search.to_string(),
            },
        }
    }

    fn remove(&mut self, target: &str) -> Outcome {
        let items = self.cart.items();
        match resolve(target, items.iter().map(|item| &item.product)) {
            Resolution::One(product) => self.apply_remove(product),
            Resolution::Many(candidates) => self.defer(Intent::Remove, candidates, MIN_QUANTITY),
            Resolution::None => Outcome::NotFound {
                intent: Intent::Remove,
                query: target.to_string(),
            },
        }
    }

    fn defer(&mut self, intent: Intent, candidates: Vec<Product>, quantity: u32) -> Outcome {
        debug!(%intent, candidates = candidates.len(), "Instruction needs disambiguation");
        self.pending = Some(PendingAction {
            intent,
            candidates: candidates.clone(),
            quantity,
        });
        Outcome::Ambiguous { intent, candidates }
    }

    fn apply_add(&self, product: Product, quantity: u32) -> Outcome {
        self.cart.add_item(product.clone(), quantity);
        Outcome::Added { product, quantity }
    }

    fn apply_remove(&self, product: Product) -> Outcome {
        self.cart.remove_item(product.id);
        Outcome::Removed { product }
    }
}

enum Resolution {
    None,
    One(Product),
    Many(Vec<Product>),
}

/// AND-of-substrings match: every word of `search` must occur somewhere in
/// the normalized name. An exact normalized-name match wins outright.
fn resolve<'a>(search: &str, products: impl Iterator<Item = &'a Product>) -> Resolution {
    let words: Vec<&str> = search.split_whitespace().collect();
    let mut candidates = Vec::new();

    for product in products {
        let name = normalize(&product.name);
        if name == search {
            return Resolution::One(product.clone());
        }
        if words.iter().all(|w| name.contains(w)) {
            candidates.push(product.clone());
        }
    }

    match candidates.len() {
        0 => Resolution::None,
        1 => candidates.pop().map_or(Resolution::None, Resolution::One),
        _ => Resolution::Many(candidates),
    }
}
