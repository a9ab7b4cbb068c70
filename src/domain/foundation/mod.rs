//! Foundation layer - value objects shared across the domain.

mod ids;
mod timestamp;

pub use ids::{ParticipantId, WorkItemId};
pub use timestamp::Timestamp;
