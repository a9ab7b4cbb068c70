//! Estimate value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, Timestamp};

/// One participant's proposed value for a work item.
///
/// Identity is implicit: the participant id within the owning work item.
/// Deck membership of the value is enforced by the work item, which knows
/// the session's deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    participant_id: ParticipantId,
    value: String,
    submitted_at: Timestamp,
}

impl Estimate {
    /// Creates a new estimate stamped with the current time.
    pub fn new(participant_id: ParticipantId, value: String) -> Self {
        Self {
            participant_id,
            value,
            submitted_at: Timestamp::now(),
        }
    }

    /// Reconstitutes an estimate from persistence.
    pub fn hydrate(participant_id: ParticipantId, value: String, submitted_at: Timestamp) -> Self {
        Self {
            participant_id,
            value,
            submitted_at,
        }
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    /// Replaces the value and submission timestamp in place.
    pub(crate) fn update(&mut self, value: String) {
        self.value = value;
        self.submitted_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_value_and_timestamp() {
        let mut est = Estimate::new(ParticipantId::new(), "8".to_string());
        let first_submitted = est.submitted_at();
        std::thread::sleep(std::time::Duration::from_millis(5));

        est.update("5".to_string());

        assert_eq!(est.value(), "5");
        assert!(est.submitted_at().is_after(&first_submitted));
    }
}
