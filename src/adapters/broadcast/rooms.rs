//! Session rooms for code-keyed update routing.
//!
//! Rooms are organized by session code: subscribing to a code guarantees
//! delivery of every update published to that code until the subscriber
//! leaves. When an update is published for one session, only that room's
//! subscribers receive it.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::session::{SessionCode, SessionError, SessionUpdate};
use crate::ports::ChangeNotifier;

/// Unique identifier for one subscriber connection.
///
/// Generated server-side when a client subscribes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Creates a new random SubscriberId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room registry keyed by session code.
///
/// Join/leave manage group membership; publishing never blocks on
/// subscribers. Slow subscribers lose oldest messages when a room's buffer
/// fills and resynchronize by re-fetching the session.
///
/// # Thread safety
///
/// Publishes (reads of the registry) vastly outnumber joins/leaves, so the
/// registry sits behind an `RwLock` and concurrent publishes to different
/// rooms do not contend.
pub struct SessionRooms {
    rooms: RwLock<HashMap<SessionCode, broadcast::Sender<SessionUpdate>>>,
    subscriber_rooms: RwLock<HashMap<SubscriberId, SessionCode>>,
    channel_capacity: usize,
}

impl SessionRooms {
    /// Creates a room registry with the given per-room buffer capacity.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            subscriber_rooms: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Creates with default capacity (128 updates per room).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Subscribes to a session's updates, creating the room on demand.
    ///
    /// Every update published to `code` after this call reaches the
    /// returned receiver until the subscriber leaves or lags out.
    pub async fn join(
        &self,
        code: &SessionCode,
        subscriber_id: SubscriberId,
    ) -> broadcast::Receiver<SessionUpdate> {
        let mut rooms = self.rooms.write().await;
        let sender = rooms.entry(code.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.subscriber_rooms
            .write()
            .await
            .insert(subscriber_id, code.clone());

        sender.subscribe()
    }

    /// Removes a subscriber, dropping its room once empty.
    pub async fn leave(&self, subscriber_id: &SubscriberId) {
        let mut subscriber_rooms = self.subscriber_rooms.write().await;

        if let Some(code) = subscriber_rooms.remove(subscriber_id) {
            // Emptiness is checked under the write lock, so a subscriber
            // joining concurrently cannot have its room dropped underneath
            // it.
            let mut rooms = self.rooms.write().await;
            if let Some(sender) = rooms.get(&code) {
                if sender.receiver_count() == 0 {
                    rooms.remove(&code);
                }
            }
        }
    }

    /// Number of current subscribers for a code (0 if no room exists).
    pub async fn subscriber_count(&self, code: &SessionCode) -> usize {
        self.rooms
            .read()
            .await
            .get(code)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Codes of all rooms with at least one past subscriber.
    pub async fn active_rooms(&self) -> Vec<SessionCode> {
        self.rooms.read().await.keys().cloned().collect()
    }
}

impl Default for SessionRooms {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl ChangeNotifier for SessionRooms {
    async fn publish(&self, code: &SessionCode, update: SessionUpdate) -> Result<(), SessionError> {
        let rooms = self.rooms.read().await;
        if let Some(sender) = rooms.get(code) {
            // A send error only means no receivers are connected.
            let _ = sender.send(update);
        }
        Ok(())
    }
}
