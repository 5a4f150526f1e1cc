//! Session-scoped fan-out of server events to live subscribers.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::ws::ServerMessage;

/// Broadcast hub delivering events to every subscriber of a session id.
///
/// Channels are created lazily on first use and delivery is fire-and-forget:
/// no transition ever waits on a subscriber, and subscribers that join after
/// an event miss it (only the explicit `state` snapshot replays history).
pub struct BroadcastHub {
    channels: DashMap<String, broadcast::Sender<ServerMessage>>,
    capacity: usize,
}

impl BroadcastHub {
    /// Construct a hub whose per-session channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Register a subscriber for `sid` events.
    ///
    /// Session existence is checked by the caller; the hub only manages
    /// channels.
    pub fn subscribe(&self, sid: &str) -> broadcast::Receiver<ServerMessage> {
        self.channels
            .entry(sid.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to all current subscribers of `sid`, ignoring delivery
    /// errors and sessions nobody watches.
    pub fn publish(&self, sid: &str, message: ServerMessage) {
        if let Some(sender) = self.channels.get(sid) {
            let _ = sender.send(message);
        }
    }

    /// Number of live subscribers for `sid`.
    pub fn subscriber_count(&self, sid: &str) -> usize {
        self.channels
            .get(sid)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
