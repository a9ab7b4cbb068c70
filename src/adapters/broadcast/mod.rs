//! In-process publish/subscribe transport for session updates.

mod rooms;

pub use rooms::{SessionRooms, SubscriberId};
