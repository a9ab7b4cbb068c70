//! ChangeNotifier port - delivery of session snapshots to subscribers.
//!
//! The core only requires that a subscriber of a session code receives
//! everything published to that code until it unsubscribes; group-membership
//! mechanics belong to the transport adapter.

use async_trait::async_trait;

use crate::domain::session::{SessionCode, SessionError, SessionUpdate};

/// Port for publishing reason-tagged snapshots to a session's subscribers.
///
/// Delivery is at-least-once to currently subscribed observers; observers
/// that need stronger guarantees resynchronize by re-fetching the aggregate.
/// Publication must never block on or wait for subscriber acknowledgment.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// Publishes an update to every current subscriber of the code.
    ///
    /// Publishing to a code with no subscribers is a successful no-op.
    async fn publish(&self, code: &SessionCode, update: SessionUpdate) -> Result<(), SessionError>;
}
