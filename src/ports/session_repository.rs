//! Session repository port.
//!
//! Persistence contract for the session aggregate, polymorphic over two
//! realizations: a volatile in-process map and a durable, partitioned,
//! optimistically-versioned store shared by multiple service instances.
//!
//! # Design
//!
//! - `add` is create-if-absent: the generated session code is assumed (not
//!   verified) unique, so the first writer wins and a racing duplicate is
//!   silently ignored.
//! - Mutations are persisted as fine-grained deltas mirroring the domain
//!   operations, never as full aggregate rewrites.
//! - Conflict retry is owned entirely by the durable implementation; the
//!   caller sees either success or a terminal `ConcurrencyConflict`.

use async_trait::async_trait;

use crate::domain::foundation::WorkItemId;
use crate::domain::session::{Estimate, Participant, Session, SessionCode, SessionError, WorkItem};

/// Repository port for session aggregate persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create-if-absent write of a brand-new aggregate.
    async fn add(&self, session: &Session) -> Result<(), SessionError>;

    /// Reconstructs the full aggregate for a code, or `None` if unknown.
    async fn get(&self, code: &SessionCode) -> Result<Option<Session>, SessionError>;

    /// Checks whether a session exists.
    async fn exists(&self, code: &SessionCode) -> Result<bool, SessionError>;

    /// Persists a newly added participant.
    async fn add_participant(
        &self,
        code: &SessionCode,
        participant: &Participant,
    ) -> Result<(), SessionError>;

    /// Persists a newly added work item.
    async fn add_work_item(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError>;

    /// Inserts or replaces one participant's estimate for a work item.
    async fn upsert_estimate(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
        estimate: &Estimate,
    ) -> Result<(), SessionError>;

    /// Persists a work item's state fields (state, final value, reveal and
    /// finalize timestamps) after a transition.
    async fn update_work_item_state(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError>;

    /// Removes every estimate owned by a work item (restart path).
    async fn clear_work_item_estimates(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
    ) -> Result<(), SessionError>;

    /// Bulk safety sweep: returns every still-`Revealed` work item of the
    /// session to active estimation and drops its estimates.
    async fn reset_revealed_work_items(&self, code: &SessionCode) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SessionRepository) {}
    }
}
