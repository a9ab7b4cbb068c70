//! WorkItem entity and its estimation state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ParticipantId, Timestamp, WorkItemId};

use super::{Deck, Estimate, SessionError};

/// Maximum length for a work item title.
pub const MAX_TITLE_LENGTH: usize = 140;

/// Estimation state of a work item.
///
/// ```text
/// ActiveEstimating ──reveal──▶ Revealed ──finalize──▶ Finalized
///        ▲                        │
///        └───────restart──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkItemState {
    ActiveEstimating,
    Revealed,
    Finalized,
}

impl WorkItemState {
    /// Stable string form used for persistence and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemState::ActiveEstimating => "ActiveEstimating",
            WorkItemState::Revealed => "Revealed",
            WorkItemState::Finalized => "Finalized",
        }
    }
}

impl fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkItemState {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ActiveEstimating" => Ok(WorkItemState::ActiveEstimating),
            "Revealed" => Ok(WorkItemState::Revealed),
            "Finalized" => Ok(WorkItemState::Finalized),
            other => Err(SessionError::storage(format!(
                "Unknown work item state: {}",
                other
            ))),
        }
    }
}

/// A single unit being estimated.
///
/// Owns its estimates, keyed by participant id: at most one per participant,
/// later submissions overwrite the prior value and timestamp. Estimates are
/// kept in first-submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    id: WorkItemId,
    title: String,
    created_at: Timestamp,
    state: WorkItemState,
    revealed_at: Option<Timestamp>,
    finalized_at: Option<Timestamp>,
    final_estimate: Option<String>,
    estimates: Vec<Estimate>,
}

impl WorkItem {
    /// Creates a new work item in `ActiveEstimating`.
    ///
    /// # Errors
    ///
    /// `Validation` if the trimmed title is empty or longer than 140
    /// characters.
    pub fn new(title: &str) -> Result<Self, SessionError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(SessionError::validation("title", "Title cannot be empty"));
        }
        if trimmed.chars().count() > MAX_TITLE_LENGTH {
            return Err(SessionError::validation(
                "title",
                format!("Title must be {} characters or less", MAX_TITLE_LENGTH),
            ));
        }
        Ok(Self {
            id: WorkItemId::new(),
            title: trimmed.to_string(),
            created_at: Timestamp::now(),
            state: WorkItemState::ActiveEstimating,
            revealed_at: None,
            finalized_at: None,
            final_estimate: None,
            estimates: Vec::new(),
        })
    }

    /// Reconstitutes a work item from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: WorkItemId,
        title: String,
        created_at: Timestamp,
        state: WorkItemState,
        revealed_at: Option<Timestamp>,
        finalized_at: Option<Timestamp>,
        final_estimate: Option<String>,
        estimates: Vec<Estimate>,
    ) -> Self {
        Self {
            id,
            title,
            created_at,
            state,
            revealed_at,
            finalized_at,
            final_estimate,
            estimates,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> WorkItemId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn state(&self) -> WorkItemState {
        self.state
    }

    pub fn revealed_at(&self) -> Option<Timestamp> {
        self.revealed_at
    }

    pub fn finalized_at(&self) -> Option<Timestamp> {
        self.finalized_at
    }

    pub fn final_estimate(&self) -> Option<&str> {
        self.final_estimate.as_deref()
    }

    pub fn estimates(&self) -> &[Estimate] {
        &self.estimates
    }

    /// Looks up a participant's estimate, if any.
    pub fn estimate_for(&self, participant_id: ParticipantId) -> Option<&Estimate> {
        self.estimates
            .iter()
            .find(|e| e.participant_id() == participant_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // State machine
    // ─────────────────────────────────────────────────────────────────────

    /// Records or replaces a participant's estimate.
    ///
    /// # Errors
    ///
    /// - `IllegalState` unless the item is `ActiveEstimating` or `Revealed`
    /// - `Validation` if the value is not a deck member
    pub fn add_or_update_estimate(
        &mut self,
        participant_id: ParticipantId,
        value: &str,
        deck: &Deck,
    ) -> Result<Estimate, SessionError> {
        if !matches!(
            self.state,
            WorkItemState::ActiveEstimating | WorkItemState::Revealed
        ) {
            return Err(SessionError::illegal_state(format!(
                "Cannot add estimate while {}",
                self.state
            )));
        }
        if !deck.contains(value) {
            return Err(SessionError::validation(
                "value",
                format!("'{}' is not in the session deck", value),
            ));
        }

        match self
            .estimates
            .iter_mut()
            .find(|e| e.participant_id() == participant_id)
        {
            Some(existing) => {
                existing.update(value.to_string());
                Ok(existing.clone())
            }
            None => {
                let estimate = Estimate::new(participant_id, value.to_string());
                self.estimates.push(estimate.clone());
                Ok(estimate)
            }
        }
    }

    /// Exposes all submitted estimates.
    ///
    /// Idempotent: revealing an already-revealed (or finalized) item changes
    /// nothing, so retried reveal requests never fail. Returns whether the
    /// state changed.
    pub fn reveal(&mut self) -> bool {
        if self.state != WorkItemState::ActiveEstimating {
            return false;
        }
        self.state = WorkItemState::Revealed;
        self.revealed_at = Some(Timestamp::now());
        true
    }

    /// Fixes the agreed value, ending estimation for this item.
    ///
    /// # Errors
    ///
    /// - `IllegalState` unless the item is `Revealed`
    /// - `Validation` if the value is the unknown token or not a deck member
    pub fn finalize(&mut self, value: &str, deck: &Deck) -> Result<(), SessionError> {
        if self.state != WorkItemState::Revealed {
            return Err(SessionError::illegal_state(format!(
                "Cannot finalize while {}",
                self.state
            )));
        }
        if Deck::is_unknown(value) {
            return Err(SessionError::validation(
                "value",
                "Final estimate cannot be the unknown token",
            ));
        }
        if !deck.contains(value) {
            return Err(SessionError::validation(
                "value",
                format!("'{}' is not in the session deck", value),
            ));
        }
        self.final_estimate = Some(value.to_string());
        self.finalized_at = Some(Timestamp::now());
        self.state = WorkItemState::Finalized;
        Ok(())
    }

    /// Discards all estimates and returns a revealed item to active
    /// estimation.
    ///
    /// Silent no-op from any state other than `Revealed`. Returns whether
    /// the state changed.
    pub fn restart(&mut self) -> bool {
        if self.state != WorkItemState::Revealed {
            return false;
        }
        self.estimates.clear();
        self.final_estimate = None;
        self.revealed_at = None;
        self.finalized_at = None;
        self.state = WorkItemState::ActiveEstimating;
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Persistence replay (volatile store convergence)
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn apply_estimate(&mut self, estimate: Estimate) {
        match self
            .estimates
            .iter_mut()
            .find(|e| e.participant_id() == estimate.participant_id())
        {
            Some(existing) => *existing = estimate,
            None => self.estimates.push(estimate),
        }
    }

    pub(crate) fn apply_state(
        &mut self,
        state: WorkItemState,
        final_estimate: Option<String>,
        revealed_at: Option<Timestamp>,
        finalized_at: Option<Timestamp>,
    ) {
        self.state = state;
        self.final_estimate = final_estimate;
        self.revealed_at = revealed_at;
        self.finalized_at = finalized_at;
    }

    pub(crate) fn apply_clear_estimates(&mut self) {
        self.estimates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new("Login page").unwrap()
    }

    fn deck() -> Deck {
        Deck::default()
    }

    #[test]
    fn new_work_item_starts_active_with_no_estimates() {
        let wi = item();
        assert_eq!(wi.state(), WorkItemState::ActiveEstimating);
        assert!(wi.final_estimate().is_none());
        assert!(wi.revealed_at().is_none());
        assert!(wi.finalized_at().is_none());
        assert!(wi.estimates().is_empty());
    }

    #[test]
    fn title_is_trimmed_and_length_checked() {
        let wi = WorkItem::new("  Checkout flow  ").unwrap();
        assert_eq!(wi.title(), "Checkout flow");

        assert!(WorkItem::new("   ").is_err());
        assert!(WorkItem::new(&"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn resubmission_overwrites_prior_estimate() {
        let mut wi = item();
        let alice = ParticipantId::new();

        wi.add_or_update_estimate(alice, "8", &deck()).unwrap();
        wi.add_or_update_estimate(alice, "5", &deck()).unwrap();

        assert_eq!(wi.estimates().len(), 1);
        assert_eq!(wi.estimate_for(alice).unwrap().value(), "5");
    }

    #[test]
    fn estimate_value_must_be_in_deck() {
        let mut wi = item();
        let err = wi
            .add_or_update_estimate(ParticipantId::new(), "7", &deck())
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation { .. }));
    }

    #[test]
    fn estimating_is_allowed_while_revealed() {
        let mut wi = item();
        wi.reveal();
        assert!(wi
            .add_or_update_estimate(ParticipantId::new(), "3", &deck())
            .is_ok());
    }

    #[test]
    fn estimating_after_finalize_is_illegal() {
        let mut wi = item();
        wi.reveal();
        wi.finalize("5", &deck()).unwrap();

        let err = wi
            .add_or_update_estimate(ParticipantId::new(), "3", &deck())
            .unwrap_err();
        assert!(matches!(err, SessionError::IllegalState { .. }));
    }

    #[test]
    fn reveal_twice_is_idempotent() {
        let mut wi = item();
        assert!(wi.reveal());
        let revealed_at = wi.revealed_at();

        assert!(!wi.reveal());
        assert_eq!(wi.state(), WorkItemState::Revealed);
        assert_eq!(wi.revealed_at(), revealed_at);
    }

    #[test]
    fn finalize_requires_revealed_state() {
        let mut wi = item();
        let err = wi.finalize("5", &deck()).unwrap_err();
        assert!(matches!(err, SessionError::IllegalState { .. }));
    }

    #[test]
    fn finalize_rejects_unknown_token() {
        let mut wi = item();
        wi.reveal();
        let err = wi.finalize("?", &deck()).unwrap_err();
        assert!(matches!(err, SessionError::Validation { .. }));
    }

    #[test]
    fn finalize_rejects_value_outside_deck() {
        let mut wi = item();
        wi.reveal();
        assert!(wi.finalize("42", &deck()).is_err());
    }

    #[test]
    fn finalize_sets_value_timestamp_and_state() {
        let mut wi = item();
        wi.reveal();
        wi.finalize("5", &deck()).unwrap();

        assert_eq!(wi.state(), WorkItemState::Finalized);
        assert_eq!(wi.final_estimate(), Some("5"));
        assert!(wi.finalized_at().is_some());
    }

    #[test]
    fn restart_clears_estimates_and_returns_to_active() {
        let mut wi = item();
        wi.add_or_update_estimate(ParticipantId::new(), "8", &deck())
            .unwrap();
        wi.reveal();

        assert!(wi.restart());
        assert_eq!(wi.state(), WorkItemState::ActiveEstimating);
        assert!(wi.estimates().is_empty());
        assert!(wi.final_estimate().is_none());
        assert!(wi.revealed_at().is_none());
        assert!(wi.finalized_at().is_none());
    }

    #[test]
    fn restart_is_noop_outside_revealed() {
        let mut wi = item();
        assert!(!wi.restart());
        assert_eq!(wi.state(), WorkItemState::ActiveEstimating);

        wi.reveal();
        wi.finalize("5", &deck()).unwrap();
        assert!(!wi.restart());
        assert_eq!(wi.state(), WorkItemState::Finalized);
        assert_eq!(wi.final_estimate(), Some("5"));
    }

    #[test]
    fn state_round_trips_through_string_form() {
        for state in [
            WorkItemState::ActiveEstimating,
            WorkItemState::Revealed,
            WorkItemState::Finalized,
        ] {
            assert_eq!(state.as_str().parse::<WorkItemState>().unwrap(), state);
        }
        assert!("Unknown".parse::<WorkItemState>().is_err());
    }
}
