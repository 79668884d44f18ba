//! Ordered keyword rules for intent classification.

use regex::Regex;
use std::fmt;

/// What an instruction asks the cart to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Add,
    Remove,
    Clear,
    Checkout,
}

impl Intent {
    /// Product-targeting intents need a search text after the keyword.
    pub const fn needs_target(self) -> bool {
        matches!(self, Self::Add | Self::Remove)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::Clear => write!(f, "clear"),
            Self::Checkout => write!(f, "checkout"),
        }
    }
}

/// Keywords per intent, in priority order. All entries are already normalized.
pub const DEFAULT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Add,
        &["agregar", "agrega", "anadir", "anade", "sumar", "add"],
    ),
    (
        Intent::Remove,
        &[
            "quitar", "quita", "eliminar", "elimina", "remover", "sacar", "borrar", "remove",
        ],
    ),
    (Intent::Clear, &["vaciar", "vacia", "limpiar", "clear"]),
    (Intent::Checkout, &["pagar", "checkout", "finalizar"]),
];

/// Filler that names the cart itself rather than a product.
const CART_PHRASES: &[&str] = &["al carrito", "del carrito", "to cart", "from cart", "carrito"];

/// A classified instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub intent: Intent,
    /// Normalized text after the keyword, with cart phrases removed.
    pub target: String,
}

struct Rule {
    intent: Intent,
    pattern: Regex,
    keywords: Vec<String>,
}

/// First-match-wins dispatcher over normalized text.
pub struct RuleSet {
    rules: Vec<Rule>,
    cart_phrases: Regex,
    trailing_quantity: Regex,
}

impl RuleSet {
    /// Builds a rule set from `(intent, keywords)` pairs; slice order is
    /// evaluation order.
    pub fn new(table: &[(Intent, &[&str])]) -> Result<Self, regex::Error> {
        let rules = table
            .iter()
            .map(|(intent, keywords)| {
                Ok(Rule {
                    intent: *intent,
                    pattern: whole_word_alternation(keywords)?,
                    keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            cart_phrases: whole_word_alternation(CART_PHRASES)?,
            trailing_quantity: Regex::new(r"^(?:(.*?) )?(\d+)$")?,
        })
    }

    /// The built-in Spanish/English keyword table.
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_KEYWORDS)
    }

    /// Classifies already-normalized text. Returns `None` when no keyword
    /// occurs as a whole word.
    pub fn classify(&self, normalized: &str) -> Option<Command> {
        self.rules.iter().find_map(|rule| {
            let found = rule.pattern.find(normalized)?;
            let rest = &normalized[found.end()..];
            Some(Command {
                intent: rule.intent,
                target: self.strip_cart_phrases(rest),
            })
        })
    }

    /// Splits a trailing run of digits off the search text.
    ///
    /// Returns `(search, Some(quantity))` when the text ends in digits that
    /// fit a `u32`, otherwise the text unchanged and `None`. `search` may be
    /// empty when the text was digits only.
    pub fn split_quantity<'a>(&self, target: &'a str) -> (&'a str, Option<u32>) {
        let Some(caps) = self.trailing_quantity.captures(target) else {
            return (target, None);
        };
        let Some(quantity) = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            return (target, None);
        };
        let search = caps.get(1).map_or("", |m| m.as_str());
        (search, Some(quantity))
    }

    /// Every keyword, in priority order, for "unrecognized" feedback.
    pub fn keywords(&self) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|r| r.keywords.iter().cloned())
            .collect()
    }

    /// One representative keyword per intent (`agregar, quitar, vaciar, pagar`).
    pub fn primary_keywords(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|r| r.keywords.first().cloned())
            .collect()
    }

    fn strip_cart_phrases(&self, text: &str) -> String {
        self.cart_phrases
            .replace_all(text, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("intents", &self.rules.iter().map(|r| r.intent).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// `\b(?:a|b|c)\b`, longest alternatives first so multi-word phrases win.
fn whole_word_alternation(words: &[&str]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let alternation = sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b"))
}
