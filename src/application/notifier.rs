//! Fire-and-forget change notification.

use std::sync::Arc;

use crate::domain::session::{ChangeReason, Session, SessionSnapshot, SessionUpdate};
use crate::ports::ChangeNotifier;

/// Publishes reason-tagged snapshots after successful mutations.
///
/// Delivery is detached from the mutating call: the snapshot is captured
/// synchronously (so it reflects the state the mutation produced) and handed
/// to a background task. A failed publish is logged and swallowed; observers
/// resynchronize by re-fetching the session.
#[derive(Clone)]
pub struct SessionChangeNotifier {
    notifier: Arc<dyn ChangeNotifier>,
}

impl SessionChangeNotifier {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { notifier }
    }

    /// Broadcasts the session's current state to its subscribers.
    pub fn notify(&self, session: &Session, reason: ChangeReason) {
        let update = SessionUpdate {
            reason,
            session: SessionSnapshot::of(session),
        };
        let code = session.code().clone();
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            if let Err(e) = notifier.publish(&code, update).await {
                tracing::warn!(code = %code, error = %e, "Failed to publish session update");
            }
        });
    }
}
