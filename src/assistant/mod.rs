//! Free-text cart commands ("agregar laptop 2", "vaciar carrito").
//!
//! Instructions, typed or transcribed from speech, are normalized, routed
//! through an ordered rule list (add, remove, clear, checkout) and resolved
//! against the in-memory catalog with AND-of-substrings matching. The
//! interpreter writes to the cart store only; checkout is reported back to
//! the caller, which owns the network call.

mod interpreter;
pub mod normalize;
mod rules;


pub use interpreter::{CommandInterpreter, Outcome, PendingAction};
pub use normalize::normalize;
pub use rules::{Command, DEFAULT_KEYWORDS, Intent, RuleSet};
