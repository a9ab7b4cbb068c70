//! Session code value object.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SessionError;

/// Alphabet for session codes: 26 uppercase letters plus 10 digits.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed length of a session code.
pub const CODE_LENGTH: usize = 6;

/// Short shareable identifier for a session.
///
/// Codes are drawn uniformly at random and assumed (not verified) unique;
/// the repository's create-if-absent write is the actual uniqueness
/// boundary, first-writer-wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Generates a new random session code.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parses a code from user input, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// `Validation` if the code is not exactly 6 characters from `[A-Z0-9]`.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.len() != CODE_LENGTH {
            return Err(SessionError::validation(
                "code",
                format!("Session code must be exactly {} characters", CODE_LENGTH),
            ));
        }
        if !normalized.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
            return Err(SessionError::validation(
                "code",
                "Session code may only contain letters and digits",
            ));
        }
        Ok(Self(normalized))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionCode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generate_produces_six_characters_from_alphabet() {
        let code = SessionCode::generate();
        assert_eq!(code.as_str().len(), CODE_LENGTH);
        assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn parse_normalizes_to_uppercase() {
        let code = SessionCode::parse("ab12cd").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(SessionCode::parse("ABC").is_err());
        assert!(SessionCode::parse("ABCDEFG").is_err());
    }

    #[test]
    fn parse_rejects_invalid_characters() {
        assert!(SessionCode::parse("AB-12!").is_err());
    }

    proptest! {
        #[test]
        fn generated_codes_always_reparse(_n in 0..100u32) {
            let code = SessionCode::generate();
            let reparsed = SessionCode::parse(code.as_str()).unwrap();
            prop_assert_eq!(code, reparsed);
        }
    }
}
