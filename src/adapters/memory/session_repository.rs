//! Volatile in-process session repository.
//!
//! A single process-wide map from code to aggregate. `get` hands out a
//! clone; delta operations replay the same change onto the stored aggregate
//! so subsequent reads converge with what the caller mutated.
//!
//! Individual field mutations are not serialized against each other beyond
//! the map lock, so this realization is only safe for single-writer-at-a-
//! time use. It targets local/dev/test, not multi-instance deployment.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::WorkItemId;
use crate::domain::session::{Estimate, Participant, Session, SessionCode, SessionError, WorkItem};
use crate::ports::SessionRepository;

/// In-memory implementation of [`SessionRepository`].
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionCode, Session>>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (for tests and diagnostics).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn with_session<F>(&self, code: &SessionCode, mutate: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(code) {
            mutate(session);
        }
        // An unknown code is not an error here: the delta write follows a
        // successful get, so a vanished entry means the session was dropped
        // and there is nothing left to update.
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn add(&self, session: &Session) -> Result<(), SessionError> {
        // Create-if-absent, first-writer-wins.
        self.sessions
            .write()
            .await
            .entry(session.code().clone())
            .or_insert_with(|| session.clone());
        Ok(())
    }

    async fn get(&self, code: &SessionCode) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(code).cloned())
    }

    async fn exists(&self, code: &SessionCode) -> Result<bool, SessionError> {
        Ok(self.sessions.read().await.contains_key(code))
    }

    async fn add_participant(
        &self,
        code: &SessionCode,
        participant: &Participant,
    ) -> Result<(), SessionError> {
        let participant = participant.clone();
        self.with_session(code, |s| s.apply_participant(participant))
            .await
    }

    async fn add_work_item(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError> {
        let work_item = work_item.clone();
        self.with_session(code, |s| s.apply_work_item(work_item))
            .await
    }

    async fn upsert_estimate(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
        estimate: &Estimate,
    ) -> Result<(), SessionError> {
        let estimate = estimate.clone();
        self.with_session(code, |s| s.apply_estimate(work_item_id, estimate))
            .await
    }

    async fn update_work_item_state(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError> {
        let (state, final_estimate, revealed_at, finalized_at) = (
            work_item.state(),
            work_item.final_estimate().map(str::to_string),
            work_item.revealed_at(),
            work_item.finalized_at(),
        );
        let id = work_item.id();
        self.with_session(code, |s| {
            s.apply_work_item_state(id, state, final_estimate, revealed_at, finalized_at)
        })
        .await
    }

    async fn clear_work_item_estimates(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
    ) -> Result<(), SessionError> {
        self.with_session(code, |s| s.apply_clear_estimates(work_item_id))
            .await
    }

    async fn reset_revealed_work_items(&self, code: &SessionCode) -> Result<(), SessionError> {
        self.with_session(code, |s| s.apply_reset_revealed()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::WorkItemState;

    fn new_session() -> Session {
        Session::create(None, None, None)
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let repo = InMemorySessionRepository::new();
        let session = new_session();

        repo.add(&session).await.unwrap();

        assert!(repo.exists(session.code()).await.unwrap());
        assert_eq!(repo.get(session.code()).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn get_unknown_code_returns_none() {
        let repo = InMemorySessionRepository::new();
        let code = SessionCode::generate();
        assert_eq!(repo.get(&code).await.unwrap(), None);
        assert!(!repo.exists(&code).await.unwrap());
    }

    #[tokio::test]
    async fn add_is_first_writer_wins() {
        let repo = InMemorySessionRepository::new();
        let mut first = new_session();
        first.add_participant("Alice").unwrap();
        let code = first.code().clone();

        repo.add(&first).await.unwrap();

        // Racing create with the same code must not clobber the stored one.
        let second = Session::create(Some(code.clone()), None, None);
        repo.add(&second).await.unwrap();

        let stored = repo.get(&code).await.unwrap().unwrap();
        assert_eq!(stored.participants().len(), 1);
    }

    #[tokio::test]
    async fn deltas_converge_with_the_mutated_clone() {
        let repo = InMemorySessionRepository::new();
        let session = new_session();
        let code = session.code().clone();
        repo.add(&session).await.unwrap();

        // Mutate a clone the way the coordinator does, then replay deltas.
        let mut working = repo.get(&code).await.unwrap().unwrap();
        let alice = working.add_participant("Alice").unwrap();
        let item = working.add_work_item("Login page").unwrap();
        repo.add_participant(&code, &alice).await.unwrap();
        repo.add_work_item(&code, &item).await.unwrap();

        let est = working
            .add_or_update_estimate(item.id(), alice.id(), "8")
            .unwrap();
        repo.upsert_estimate(&code, item.id(), &est).await.unwrap();

        let revealed = working.reveal(item.id()).unwrap();
        repo.update_work_item_state(&code, &revealed).await.unwrap();

        let stored = repo.get(&code).await.unwrap().unwrap();
        assert_eq!(stored, working);
        assert_eq!(
            stored.work_item(item.id()).unwrap().state(),
            WorkItemState::Revealed
        );
    }

    #[tokio::test]
    async fn clear_and_reset_deltas_apply() {
        let repo = InMemorySessionRepository::new();
        let mut session = new_session();
        let alice = session.add_participant("Alice").unwrap();
        let item = session.add_work_item("A").unwrap();
        session
            .add_or_update_estimate(item.id(), alice.id(), "5")
            .unwrap();
        session.reveal(item.id()).unwrap();
        repo.add(&session).await.unwrap();
        let code = session.code().clone();

        repo.reset_revealed_work_items(&code).await.unwrap();

        let stored = repo.get(&code).await.unwrap().unwrap();
        let stored_item = stored.work_item(item.id()).unwrap();
        assert_eq!(stored_item.state(), WorkItemState::ActiveEstimating);
        assert!(stored_item.estimates().is_empty());
    }

    #[tokio::test]
    async fn delta_for_vanished_session_is_benign() {
        let repo = InMemorySessionRepository::new();
        let session = new_session();
        let item = WorkItem::new("Orphan").unwrap();

        // Never added; the delta has nothing to update and succeeds.
        repo.add_work_item(session.code(), &item).await.unwrap();
        assert_eq!(repo.session_count().await, 0);
    }
}
