//! Session domain - the estimation session aggregate and its entities.
//!
//! A `Session` is one estimation room identified by a short code. It owns
//! its participants and work items; work items own their estimates. All
//! navigation is top-down by id lookup - no entity holds a back-reference
//! to its owner.

mod aggregate;
mod code;
mod deck;
mod errors;
mod estimate;
mod participant;
mod snapshot;
mod work_item;

pub use aggregate::Session;
pub use code::{SessionCode, CODE_ALPHABET, CODE_LENGTH};
pub use deck::Deck;
pub use errors::SessionError;
pub use estimate::Estimate;
pub use participant::{Participant, MAX_DISPLAY_NAME_LENGTH};
pub use snapshot::{
    ChangeReason, EstimateSnapshot, ParticipantSnapshot, SessionSnapshot, SessionUpdate,
    WorkItemSnapshot,
};
pub use work_item::{WorkItem, WorkItemState, MAX_TITLE_LENGTH};
