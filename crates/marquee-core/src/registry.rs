use dashmap::DashMap;
use std::collections::HashSet;

pub type ConnectionId = String;

/// Tracks which live connections belong to which conversation's
/// broadcast group. Membership is keyed per (connection, conversation)
/// pair, ephemeral, and process-local; nothing here touches durable
/// storage.
#[derive(Default)]
pub struct ConnectionRegistry {
    /// conversation id -> member connection ids.
    groups: DashMap<i64, HashSet<ConnectionId>>,
    /// connection id -> conversation ids it joined, for disconnect cleanup.
    memberships: DashMap<ConnectionId, HashSet<i64>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a conversation's group. Admitting an
    /// already-admitted connection is a no-op.
    pub fn admit(&self, connection_id: &str, conversation_id: i64) {
        self.groups
            .entry(conversation_id)
            .or_default()
            .insert(connection_id.to_string());
        self.memberships
            .entry(connection_id.to_string())
            .or_default()
            .insert(conversation_id);
    }

    pub fn is_member(&self, connection_id: &str, conversation_id: i64) -> bool {
        self.groups
            .get(&conversation_id)
            .map(|group| group.contains(connection_id))
            .unwrap_or(false)
    }

    /// Snapshot of the current group. May be stale by the time a
    /// broadcast driven by it completes.
    pub fn members_of(&self, conversation_id: i64) -> Vec<ConnectionId> {
        self.groups
            .get(&conversation_id)
            .map(|group| group.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a connection from every group it belongs to. Invoked
    /// from the gateway's disconnect path.
    pub fn remove(&self, connection_id: &str) {
        let Some((_, joined)) = self.memberships.remove(connection_id) else {
            return;
        };
        for conversation_id in joined {
            if let Some(mut group) = self.groups.get_mut(&conversation_id) {
                group.remove(connection_id);
                let now_empty = group.is_empty();
                drop(group);
                if now_empty {
                    self.groups
                        .remove_if(&conversation_id, |_, group| group.is_empty());
                }
            }
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
