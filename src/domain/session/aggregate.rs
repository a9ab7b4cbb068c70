//! Session aggregate root.
//!
//! The aggregate owns its participants and work items as an owned tree
//! reachable only through this root; external references use ids plus a
//! lookup, never a direct pointer. That keeps the durable realization's
//! row-based reconstruction straightforward.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, Timestamp, WorkItemId};

use super::{Deck, Estimate, Participant, SessionCode, SessionError, WorkItem, WorkItemState};

/// One estimation room.
///
/// # Invariants
///
/// - the deck is fixed at creation and never mutated
/// - display names are unique within the session, case-insensitively
/// - only the first participant carries the host flag
/// - participants and work items keep insertion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    code: SessionCode,
    created_at: Timestamp,
    deck: Deck,
    participants: Vec<Participant>,
    work_items: Vec<WorkItem>,
}

impl Session {
    /// Creates a new empty session.
    ///
    /// Omitted arguments default to a generated code, the standard deck,
    /// and the current time. The code is not verified unique here; the
    /// repository's create-if-absent write is the uniqueness boundary.
    pub fn create(
        code: Option<SessionCode>,
        deck: Option<Deck>,
        created_at: Option<Timestamp>,
    ) -> Self {
        Self {
            code: code.unwrap_or_else(SessionCode::generate),
            created_at: created_at.unwrap_or_else(Timestamp::now),
            deck: deck.unwrap_or_default(),
            participants: Vec::new(),
            work_items: Vec::new(),
        }
    }

    /// Reconstitutes a session from persistence (no validation).
    pub fn hydrate(
        code: SessionCode,
        created_at: Timestamp,
        deck: Deck,
        participants: Vec<Participant>,
        work_items: Vec<WorkItem>,
    ) -> Self {
        Self {
            code,
            created_at,
            deck,
            participants,
            work_items,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn work_items(&self) -> &[WorkItem] {
        &self.work_items
    }

    /// Looks up a work item by id.
    pub fn work_item(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.work_items.iter().find(|w| w.id() == id)
    }

    /// Ids of all work items currently in `Revealed` state.
    pub fn revealed_work_item_ids(&self) -> Vec<WorkItemId> {
        self.work_items
            .iter()
            .filter(|w| w.state() == WorkItemState::Revealed)
            .map(|w| w.id())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a participant; the first successfully added one becomes host.
    ///
    /// # Errors
    ///
    /// - `DuplicateName` if an existing trimmed name matches
    ///   case-insensitively
    /// - `Validation` for an empty or over-long display name
    pub fn add_participant(&mut self, display_name: &str) -> Result<Participant, SessionError> {
        let trimmed = display_name.trim();
        if self.participants.iter().any(|p| p.name_matches(trimmed)) {
            return Err(SessionError::duplicate_name(trimmed));
        }
        let participant = Participant::new(display_name, self.participants.is_empty())?;
        self.participants.push(participant.clone());
        Ok(participant)
    }

    /// Adds a work item in `ActiveEstimating`.
    pub fn add_work_item(&mut self, title: &str) -> Result<WorkItem, SessionError> {
        let item = WorkItem::new(title)?;
        self.work_items.push(item.clone());
        Ok(item)
    }

    /// Records or replaces one participant's estimate for a work item.
    pub fn add_or_update_estimate(
        &mut self,
        work_item_id: WorkItemId,
        participant_id: ParticipantId,
        value: &str,
    ) -> Result<Estimate, SessionError> {
        let deck = self.deck.clone();
        self.work_item_mut(work_item_id)?
            .add_or_update_estimate(participant_id, value, &deck)
    }

    /// Reveals a work item's estimates. Idempotent when already revealed.
    ///
    /// Returns the work item in its post-reveal state.
    pub fn reveal(&mut self, work_item_id: WorkItemId) -> Result<WorkItem, SessionError> {
        let item = self.work_item_mut(work_item_id)?;
        item.reveal();
        Ok(item.clone())
    }

    /// Finalizes a revealed work item with the agreed value.
    pub fn finalize(
        &mut self,
        work_item_id: WorkItemId,
        value: &str,
    ) -> Result<WorkItem, SessionError> {
        let deck = self.deck.clone();
        let item = self.work_item_mut(work_item_id)?;
        item.finalize(value, &deck)?;
        Ok(item.clone())
    }

    /// Restarts estimation on a revealed work item. Silent no-op otherwise.
    ///
    /// Returns the work item in its post-restart state.
    pub fn restart(&mut self, work_item_id: WorkItemId) -> Result<WorkItem, SessionError> {
        let item = self.work_item_mut(work_item_id)?;
        item.restart();
        Ok(item.clone())
    }

    fn work_item_mut(&mut self, id: WorkItemId) -> Result<&mut WorkItem, SessionError> {
        self.work_items
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or(SessionError::work_item_not_found(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Persistence replay
    //
    // The volatile repository converges its stored aggregate by replaying
    // the same deltas the durable store writes as rows.
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn apply_participant(&mut self, participant: Participant) {
        if !self.participants.iter().any(|p| p.id() == participant.id()) {
            self.participants.push(participant);
        }
    }

    pub(crate) fn apply_work_item(&mut self, work_item: WorkItem) {
        if !self.work_items.iter().any(|w| w.id() == work_item.id()) {
            self.work_items.push(work_item);
        }
    }

    pub(crate) fn apply_estimate(&mut self, work_item_id: WorkItemId, estimate: Estimate) {
        if let Ok(item) = self.work_item_mut(work_item_id) {
            item.apply_estimate(estimate);
        }
    }

    pub(crate) fn apply_work_item_state(
        &mut self,
        work_item_id: WorkItemId,
        state: WorkItemState,
        final_estimate: Option<String>,
        revealed_at: Option<Timestamp>,
        finalized_at: Option<Timestamp>,
    ) {
        if let Ok(item) = self.work_item_mut(work_item_id) {
            item.apply_state(state, final_estimate, revealed_at, finalized_at);
        }
    }

    pub(crate) fn apply_clear_estimates(&mut self, work_item_id: WorkItemId) {
        if let Ok(item) = self.work_item_mut(work_item_id) {
            item.apply_clear_estimates();
        }
    }

    pub(crate) fn apply_reset_revealed(&mut self) {
        for item in &mut self.work_items {
            item.restart();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session() -> Session {
        Session::create(None, None, None)
    }

    #[test]
    fn create_defaults_to_generated_code_and_standard_deck() {
        let s = session();
        assert_eq!(s.code().as_str().len(), 6);
        assert!(s.deck().contains("?"));
        assert!(s.participants().is_empty());
        assert!(s.work_items().is_empty());
    }

    #[test]
    fn first_participant_becomes_host() {
        let mut s = session();
        let alice = s.add_participant("Alice").unwrap();
        let bob = s.add_participant("Bob").unwrap();

        assert!(alice.is_host());
        assert!(!bob.is_host());
        assert_eq!(s.participants().iter().filter(|p| p.is_host()).count(), 1);
    }

    #[test]
    fn duplicate_name_is_rejected_case_insensitively() {
        let mut s = session();
        s.add_participant("Alice").unwrap();

        let err = s.add_participant("ALICE").unwrap_err();
        assert!(matches!(err, SessionError::DuplicateName { .. }));

        let err = s.add_participant("  alice  ").unwrap_err();
        assert!(matches!(err, SessionError::DuplicateName { .. }));
    }

    #[test]
    fn operations_on_unknown_work_item_fail() {
        let mut s = session();
        let missing = WorkItemId::new();
        let p = ParticipantId::new();

        assert!(matches!(
            s.add_or_update_estimate(missing, p, "5").unwrap_err(),
            SessionError::WorkItemNotFound { .. }
        ));
        assert!(s.reveal(missing).is_err());
        assert!(s.finalize(missing, "5").is_err());
        assert!(s.restart(missing).is_err());
    }

    #[test]
    fn estimate_flow_through_the_aggregate() {
        let mut s = session();
        let alice = s.add_participant("Alice").unwrap();
        let item = s.add_work_item("Login page").unwrap();

        s.add_or_update_estimate(item.id(), alice.id(), "8").unwrap();
        let est = s.add_or_update_estimate(item.id(), alice.id(), "5").unwrap();

        assert_eq!(est.value(), "5");
        assert_eq!(s.work_item(item.id()).unwrap().estimates().len(), 1);
    }

    #[test]
    fn restart_on_one_item_leaves_finalized_item_untouched() {
        let mut s = session();
        let alice = s.add_participant("Alice").unwrap();
        let done = s.add_work_item("Done item").unwrap();
        let open = s.add_work_item("Open item").unwrap();

        s.add_or_update_estimate(done.id(), alice.id(), "5").unwrap();
        s.reveal(done.id()).unwrap();
        s.finalize(done.id(), "5").unwrap();

        s.add_or_update_estimate(open.id(), alice.id(), "8").unwrap();
        s.reveal(open.id()).unwrap();
        let restarted = s.restart(open.id()).unwrap();

        assert_eq!(restarted.state(), WorkItemState::ActiveEstimating);
        assert!(restarted.estimates().is_empty());

        let finalized = s.work_item(done.id()).unwrap();
        assert_eq!(finalized.state(), WorkItemState::Finalized);
        assert_eq!(finalized.final_estimate(), Some("5"));
    }

    #[test]
    fn revealed_work_item_ids_filters_by_state() {
        let mut s = session();
        let a = s.add_work_item("A").unwrap();
        let b = s.add_work_item("B").unwrap();
        s.add_work_item("C").unwrap();

        s.reveal(a.id()).unwrap();
        s.reveal(b.id()).unwrap();
        s.finalize(b.id(), "3").unwrap();

        assert_eq!(s.revealed_work_item_ids(), vec![a.id()]);
    }

    #[test]
    fn hydrate_round_trips_a_populated_session() {
        let mut s = session();
        let alice = s.add_participant("Alice").unwrap();
        let item = s.add_work_item("Login page").unwrap();
        s.add_or_update_estimate(item.id(), alice.id(), "8").unwrap();

        let rebuilt = Session::hydrate(
            s.code().clone(),
            s.created_at(),
            s.deck().clone(),
            s.participants().to_vec(),
            s.work_items().to_vec(),
        );
        assert_eq!(rebuilt, s);
    }

    #[test]
    fn duplicate_name_folds_non_ascii_case() {
        let mut s = session();
        s.add_participant("Ölga").unwrap();

        let err = s.add_participant("ölga").unwrap_err();
        assert!(matches!(err, SessionError::DuplicateName { .. }));
    }

    proptest! {
        // Any case-variant of an existing name collides.
        #[test]
        fn any_case_variant_of_existing_name_collides(name in "[a-zA-Z]{1,20}") {
            let mut s = session();
            s.add_participant(&name).unwrap();

            let upper_collides = matches!(
                s.add_participant(&name.to_uppercase()).unwrap_err(),
                SessionError::DuplicateName { .. }
            );
            prop_assert!(upper_collides);

            let lower_collides = matches!(
                s.add_participant(&name.to_lowercase()).unwrap_err(),
                SessionError::DuplicateName { .. }
            );
            prop_assert!(lower_collides);
        }
    }
}
