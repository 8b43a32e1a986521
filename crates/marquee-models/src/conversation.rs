use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized projection of a conversation for display, with event
/// and participant references resolved inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: i64,
    pub event_id: i64,
    pub event: EventSummary,
    pub host_id: i64,
    pub host: ParticipantProfile,
    pub user_id: i64,
    pub user: ParticipantProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    /// Resolved cover image URL; empty when the file reference
    /// cannot be resolved.
    pub cover_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantProfile {
    /// Resolved avatar URL; empty when the file reference cannot be
    /// resolved.
    pub avatar: String,
    pub full_name: String,
}
