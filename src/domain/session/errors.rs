//! Session-specific error types.

use thiserror::Error;

use crate::domain::foundation::WorkItemId;

/// Errors produced by session operations.
///
/// Domain-level failures (validation, illegal state, not-found) are produced
/// synchronously by the aggregate and propagate unchanged through the
/// coordinator. `ConcurrencyConflict` only crosses the repository boundary
/// after the optimistic retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Caller-correctable input failure. Never retried.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Case-insensitive display-name collision within a session.
    #[error("Display name '{name}' is already taken in this session")]
    DuplicateName { name: String },

    /// Unknown session code.
    #[error("Session not found: {code}")]
    SessionNotFound { code: String },

    /// Unknown work item id within a session.
    #[error("Work item not found: {id}")]
    WorkItemNotFound { id: WorkItemId },

    /// Operation invalid for the work item's current state.
    #[error("Invalid state: {message}")]
    IllegalState { message: String },

    /// Durable-store optimistic retries exhausted. Transient; the caller
    /// may retry at a higher level.
    #[error("Optimistic concurrency retries exhausted for {entity}")]
    ConcurrencyConflict { entity: String },

    /// Infrastructure failure in a persistence backend.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        SessionError::DuplicateName { name: name.into() }
    }

    pub fn session_not_found(code: impl Into<String>) -> Self {
        SessionError::SessionNotFound { code: code.into() }
    }

    pub fn work_item_not_found(id: WorkItemId) -> Self {
        SessionError::WorkItemNotFound { id }
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        SessionError::IllegalState {
            message: message.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        SessionError::ConcurrencyConflict {
            entity: entity.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        SessionError::Storage(message.into())
    }

    /// True for failures the caller may meaningfully retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::ConcurrencyConflict { .. } | SessionError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_field_and_message() {
        let err = SessionError::validation("displayName", "cannot be empty");
        assert_eq!(
            err.to_string(),
            "Validation failed for 'displayName': cannot be empty"
        );
    }

    #[test]
    fn conflict_is_transient() {
        assert!(SessionError::conflict("estimate").is_transient());
        assert!(!SessionError::duplicate_name("Alice").is_transient());
        assert!(!SessionError::illegal_state("not revealed").is_transient());
    }
}
