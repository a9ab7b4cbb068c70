//! Participant value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, Timestamp};

use super::SessionError;

/// Maximum length for a participant display name.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 40;

/// One member of an estimation session.
///
/// The host flag is true only for the session's first participant and is
/// immutable thereafter. Participants are never removed in-core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    id: ParticipantId,
    display_name: String,
    joined_at: Timestamp,
    is_host: bool,
}

impl Participant {
    /// Creates a new participant with a generated id.
    ///
    /// # Errors
    ///
    /// `Validation` if the trimmed display name is empty or longer than 40
    /// characters.
    pub fn new(display_name: &str, is_host: bool) -> Result<Self, SessionError> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(SessionError::validation(
                "displayName",
                "Display name cannot be empty",
            ));
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(SessionError::validation(
                "displayName",
                format!(
                    "Display name must be {} characters or less",
                    MAX_DISPLAY_NAME_LENGTH
                ),
            ));
        }
        Ok(Self {
            id: ParticipantId::new(),
            display_name: trimmed.to_string(),
            joined_at: Timestamp::now(),
            is_host,
        })
    }

    /// Reconstitutes a participant from persistence (no validation).
    pub fn hydrate(
        id: ParticipantId,
        display_name: String,
        joined_at: Timestamp,
        is_host: bool,
    ) -> Self {
        Self {
            id,
            display_name,
            joined_at,
            is_host,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn joined_at(&self) -> Timestamp {
        self.joined_at
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Case-insensitive comparison against another (already trimmed) name.
    ///
    /// Folds the full Unicode range, not just ASCII, so "Ölga" and "ölga"
    /// collide.
    pub fn name_matches(&self, other: &str) -> bool {
        self.display_name.to_lowercase() == other.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_participant_trims_display_name() {
        let p = Participant::new("  Alice  ", false).unwrap();
        assert_eq!(p.display_name(), "Alice");
        assert!(!p.is_host());
    }

    #[test]
    fn empty_display_name_is_rejected() {
        assert!(Participant::new("", false).is_err());
        assert!(Participant::new("   ", false).is_err());
    }

    #[test]
    fn over_long_display_name_is_rejected() {
        let name = "x".repeat(MAX_DISPLAY_NAME_LENGTH + 1);
        assert!(Participant::new(&name, false).is_err());
    }

    #[test]
    fn name_at_limit_is_accepted() {
        let name = "x".repeat(MAX_DISPLAY_NAME_LENGTH);
        assert!(Participant::new(&name, false).is_ok());
    }

    #[test]
    fn name_matches_is_case_insensitive() {
        let p = Participant::new("Alice", true).unwrap();
        assert!(p.name_matches("ALICE"));
        assert!(p.name_matches("alice"));
        assert!(!p.name_matches("Bob"));
    }

    #[test]
    fn name_matches_folds_non_ascii_case() {
        let p = Participant::new("Ölga", true).unwrap();
        assert!(p.name_matches("ölga"));
        assert!(p.name_matches("ÖLGA"));

        let p = Participant::new("rené", false).unwrap();
        assert!(p.name_matches("RENÉ"));
    }
}
