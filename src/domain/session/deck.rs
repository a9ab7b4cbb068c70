//! Deck of legal estimate values.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::SessionError;

/// The non-numeric "unknown" token. A valid estimate, never a valid final
/// value.
pub const UNKNOWN_VALUE: &str = "?";

static DEFAULT_VALUES: Lazy<Vec<String>> = Lazy::new(|| {
    ["0", "1", "2", "3", "5", "8", "13", "20", "40", "100", UNKNOWN_VALUE]
        .iter()
        .map(|v| v.to_string())
        .collect()
});

/// Static catalog of legal estimate values for a session.
///
/// Fixed at session creation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck(Vec<String>);

impl Deck {
    /// Creates a deck from an explicit list of values.
    ///
    /// # Errors
    ///
    /// `Validation` if the list is empty.
    pub fn new(values: Vec<String>) -> Result<Self, SessionError> {
        if values.is_empty() {
            return Err(SessionError::validation("deck", "Deck cannot be empty"));
        }
        Ok(Self(values))
    }

    /// Returns the ordered deck values.
    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Checks whether a value belongs to this deck.
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Checks whether a value is the unknown token.
    pub fn is_unknown(value: &str) -> bool {
        value == UNKNOWN_VALUE
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self(DEFAULT_VALUES.clone())
    }
}
