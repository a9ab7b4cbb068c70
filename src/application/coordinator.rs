//! Session coordinator - the single entry point for session operations.
//!
//! Each operation follows the same shape: load the aggregate, apply the
//! domain mutation, persist the resulting delta through the repository port,
//! then broadcast a reason-tagged snapshot. Broadcasting is fire-and-forget;
//! persistence failures abort the operation before anything is announced.

use std::sync::Arc;

use crate::domain::foundation::{ParticipantId, WorkItemId};
use crate::domain::session::{
    ChangeReason, Deck, Session, SessionCode, SessionError, SessionSnapshot,
};
use crate::ports::{ChangeNotifier, SessionRepository};

use super::notifier::SessionChangeNotifier;

/// Orchestrates session operations over a repository and a notifier.
#[derive(Clone)]
pub struct SessionCoordinator {
    repository: Arc<dyn SessionRepository>,
    notifier: SessionChangeNotifier,
}

impl SessionCoordinator {
    pub fn new(repository: Arc<dyn SessionRepository>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            repository,
            notifier: SessionChangeNotifier::new(notifier),
        }
    }

    /// Creates a session with a generated code, optionally with a custom
    /// deck, and persists it create-if-absent.
    pub async fn create_session(
        &self,
        deck: Option<Deck>,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = Session::create(None, deck, None);
        self.repository.add(&session).await?;

        tracing::info!(code = %session.code(), "Session created");
        self.notifier.notify(&session, ChangeReason::Created);
        Ok(SessionSnapshot::of(&session))
    }

    /// Fetches the current snapshot of a session.
    pub async fn get_session(&self, code: &SessionCode) -> Result<SessionSnapshot, SessionError> {
        let session = self.load(code).await?;
        Ok(SessionSnapshot::of(&session))
    }

    /// Adds a participant; the first to join becomes host.
    ///
    /// Returns the new participant's id alongside the updated snapshot.
    pub async fn join(
        &self,
        code: &SessionCode,
        display_name: &str,
    ) -> Result<(ParticipantId, SessionSnapshot), SessionError> {
        let mut session = self.load(code).await?;
        let participant = session.add_participant(display_name)?;
        self.repository.add_participant(code, &participant).await?;

        self.notifier.notify(&session, ChangeReason::ParticipantJoined);
        Ok((participant.id(), SessionSnapshot::of(&session)))
    }

    /// Adds a work item, open for estimation.
    pub async fn add_work_item(
        &self,
        code: &SessionCode,
        title: &str,
    ) -> Result<(WorkItemId, SessionSnapshot), SessionError> {
        let mut session = self.load(code).await?;
        let work_item = session.add_work_item(title)?;
        self.repository.add_work_item(code, &work_item).await?;

        self.notifier.notify(&session, ChangeReason::WorkItemAdded);
        Ok((work_item.id(), SessionSnapshot::of(&session)))
    }

    /// Records or replaces one participant's estimate for a work item.
    ///
    /// The broadcast snapshot carries the new estimate count but not the
    /// value while the item is still estimating.
    pub async fn submit_estimate(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
        participant_id: ParticipantId,
        value: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut session = self.load(code).await?;
        if !session.participants().iter().any(|p| p.id() == participant_id) {
            return Err(SessionError::validation(
                "participantId",
                "Participant is not a member of this session",
            ));
        }

        let estimate = session.add_or_update_estimate(work_item_id, participant_id, value)?;
        self.repository
            .upsert_estimate(code, work_item_id, &estimate)
            .await?;

        self.notifier.notify(&session, ChangeReason::EstimateSubmitted);
        Ok(SessionSnapshot::of(&session))
    }

    /// Reveals a work item's estimates. Idempotent when already revealed.
    pub async fn reveal(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut session = self.load(code).await?;
        let work_item = session.reveal(work_item_id)?;
        self.repository
            .update_work_item_state(code, &work_item)
            .await?;

        self.notifier.notify(&session, ChangeReason::Revealed);
        Ok(SessionSnapshot::of(&session))
    }

    /// Finalizes a revealed work item with the agreed value.
    pub async fn finalize(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
        value: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut session = self.load(code).await?;
        let work_item = session.finalize(work_item_id, value)?;
        self.repository
            .update_work_item_state(code, &work_item)
            .await?;

        self.notifier.notify(&session, ChangeReason::Finalized);
        Ok(SessionSnapshot::of(&session))
    }

    /// Restarts estimation across the session: every revealed work item
    /// returns to active estimation with its estimates dropped. Finalized
    /// and still-estimating items are untouched.
    pub async fn restart(&self, code: &SessionCode) -> Result<SessionSnapshot, SessionError> {
        let mut session = self.load(code).await?;

        for id in session.revealed_work_item_ids() {
            let work_item = session.restart(id)?;
            self.repository
                .update_work_item_state(code, &work_item)
                .await?;
            self.repository.clear_work_item_estimates(code, id).await?;
        }
        // Sweep up items another writer revealed after our read.
        self.repository.reset_revealed_work_items(code).await?;

        self.notifier.notify(&session, ChangeReason::Restart);
        Ok(SessionSnapshot::of(&session))
    }

    async fn load(&self, code: &SessionCode) -> Result<Session, SessionError> {
        self.repository
            .get(code)
            .await?
            .ok_or_else(|| SessionError::session_not_found(code.as_str()))
    }
}
