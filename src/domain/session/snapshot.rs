//! Immutable session snapshots for external observers.
//!
//! Snapshots are the only shape the session leaves the core in: versionless,
//! whole-aggregate, and with the estimate visibility rule applied. Field
//! names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, Timestamp, WorkItemId};

use super::{Session, WorkItem, WorkItemState};

/// Why a snapshot was broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeReason {
    Created,
    ParticipantJoined,
    WorkItemAdded,
    EstimateSubmitted,
    Revealed,
    Finalized,
    Restart,
}

/// One participant as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub display_name: String,
    pub joined_at: Timestamp,
    pub is_host: bool,
}

/// One estimate as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSnapshot {
    pub participant_id: ParticipantId,
    pub value: String,
    pub submitted_at: Timestamp,
}

/// One work item as seen by observers.
///
/// Individual estimate values appear only while the item is `Revealed` or
/// `Finalized`; while estimating they exist internally but never leave the
/// core, so `estimates` is empty and only `estimate_count` betrays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemSnapshot {
    pub id: WorkItemId,
    pub title: String,
    pub created_at: Timestamp,
    pub state: WorkItemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_value: Option<String>,
    pub estimate_count: usize,
    pub estimates: Vec<EstimateSnapshot>,
}

impl WorkItemSnapshot {
    fn of(item: &WorkItem) -> Self {
        let visible = matches!(
            item.state(),
            WorkItemState::Revealed | WorkItemState::Finalized
        );
        let estimates = if visible {
            item.estimates()
                .iter()
                .map(|e| EstimateSnapshot {
                    participant_id: e.participant_id(),
                    value: e.value().to_string(),
                    submitted_at: e.submitted_at(),
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            id: item.id(),
            title: item.title().to_string(),
            created_at: item.created_at(),
            state: item.state(),
            revealed_at: item.revealed_at(),
            finalized_at: item.finalized_at(),
            final_value: item.final_estimate().map(str::to_string),
            estimate_count: item.estimates().len(),
            estimates,
        }
    }
}

/// The whole aggregate as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub code: String,
    pub deck: Vec<String>,
    pub created_at: Timestamp,
    pub participants: Vec<ParticipantSnapshot>,
    pub work_items: Vec<WorkItemSnapshot>,
}

impl SessionSnapshot {
    /// Projects a session into its externally visible form.
    pub fn of(session: &Session) -> Self {
        Self {
            code: session.code().as_str().to_string(),
            deck: session.deck().values().to_vec(),
            created_at: session.created_at(),
            participants: session
                .participants()
                .iter()
                .map(|p| ParticipantSnapshot {
                    id: p.id(),
                    display_name: p.display_name().to_string(),
                    joined_at: p.joined_at(),
                    is_host: p.is_host(),
                })
                .collect(),
            work_items: session.work_items().iter().map(WorkItemSnapshot::of).collect(),
        }
    }
}

/// Reason-tagged snapshot delivered to every subscriber of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub reason: ChangeReason,
    pub session: SessionSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_session() -> (Session, ParticipantId, WorkItemId) {
        let mut s = Session::create(None, None, None);
        let alice = s.add_participant("Alice").unwrap();
        let item = s.add_work_item("Login page").unwrap();
        s.add_or_update_estimate(item.id(), alice.id(), "8").unwrap();
        (s, alice.id(), item.id())
    }

    #[test]
    fn estimates_are_hidden_while_estimating() {
        let (s, _, item_id) = populated_session();
        let snapshot = SessionSnapshot::of(&s);

        let item = &snapshot.work_items[0];
        assert_eq!(item.id, item_id);
        assert!(item.estimates.is_empty());
        assert_eq!(item.estimate_count, 1);

        // The hidden value must not leak through serialization either.
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("\"value\":\"8\""));
    }

    #[test]
    fn estimates_are_visible_after_reveal() {
        let (mut s, alice, item_id) = populated_session();
        s.reveal(item_id).unwrap();

        let snapshot = SessionSnapshot::of(&s);
        let item = &snapshot.work_items[0];
        assert_eq!(item.estimates.len(), 1);
        assert_eq!(item.estimates[0].participant_id, alice);
        assert_eq!(item.estimates[0].value, "8");
    }

    #[test]
    fn finalized_item_carries_final_value() {
        let (mut s, _, item_id) = populated_session();
        s.reveal(item_id).unwrap();
        s.finalize(item_id, "8").unwrap();

        let snapshot = SessionSnapshot::of(&s);
        let item = &snapshot.work_items[0];
        assert_eq!(item.final_value.as_deref(), Some("8"));
        assert_eq!(item.state, WorkItemState::Finalized);
        assert_eq!(item.estimates.len(), 1);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let (s, _, _) = populated_session();
        let json = serde_json::to_string(&SessionSnapshot::of(&s)).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"displayName\""));
        assert!(json.contains("\"isHost\""));
        assert!(json.contains("\"workItems\""));
    }

    #[test]
    fn change_reason_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&ChangeReason::ParticipantJoined).unwrap(),
            "\"participantJoined\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeReason::Restart).unwrap(),
            "\"restart\""
        );
    }
}
