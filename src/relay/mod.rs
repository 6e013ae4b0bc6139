//! Realtime notification relay.
//!
//! Fans change events out to connected observers. Delivery is best-effort:
//! publishing never fails the surrounding request, no acknowledgement is
//! expected, and nothing in the core depends on an event arriving.

use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Kinds of change events broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewEntry,
    NewComment,
    NewLike,
    EntryUpdated,
    CommentUpdated,
    TopicUpdated,
}

/// A change event carrying the affected entity.
#[derive(Debug, Clone, Serialize)]
pub struct RelayEvent {
    pub event: EventKind,
    pub data: serde_json::Value,
    /// Client id of the originator, if it identified itself. Not sent on the
    /// wire; used to avoid echoing events back to their source.
    #[serde(skip)]
    pub origin: Option<String>,
}

/// Handle for broadcasting change events. Cheap to clone; injected into the
/// call sites that mutate content.
#[derive(Clone)]
pub struct NotificationRelay {
    tx: broadcast::Sender<RelayEvent>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Broadcast an event to all observers. Fire-and-forget: serialization
    /// failures are logged, and sending with no observers connected is fine.
    pub fn publish<T: Serialize>(&self, event: EventKind, data: &T, origin: Option<String>) {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize {:?} event: {}", event, e);
                return;
            }
        };
        // Err here only means nobody is listening.
        let _ = self.tx.send(RelayEvent {
            event,
            data,
            origin,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }
}

impl Default for NotificationRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an event should be delivered to the observer identified by
/// `client_id`. Events are broadcast to all observers except the originator.
pub fn should_deliver(event: &RelayEvent, client_id: Option<&str>) -> bool {
    match (&event.origin, client_id) {
        (Some(origin), Some(client)) => origin != client,
        _ => true,
    }
}
