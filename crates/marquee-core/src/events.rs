use crate::registry::ConnectionId;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct ServerEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
    /// Connection ids of the group members this event targets.
    pub target_connection_ids: Vec<ConnectionId>,
}

/// Broadcast-based event bus for real-time dispatch. Every live
/// WebSocket session subscribes and filters on its own connection id.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ServerEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Helper: publish a typed event targeted at a set of connections.
    pub fn dispatch_to_connections(
        &self,
        event_type: &str,
        payload: serde_json::Value,
        target_connection_ids: Vec<ConnectionId>,
    ) {
        self.publish(ServerEvent {
            event_type: event_type.to_string(),
            payload,
            target_connection_ids,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}
