use serde::{Deserialize, Serialize};

// Client -> Server opcodes
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_JOIN_CONVERSATION: u8 = 3;
pub const OP_SEND_MESSAGE: u8 = 4;

// Server -> Client opcodes
pub const OP_DISPATCH: u8 = 0;
pub const OP_INVALID_SESSION: u8 = 9;
pub const OP_HELLO: u8 = 10;
pub const OP_HEARTBEAT_ACK: u8 = 11;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

// Dispatch event names
pub const EVENT_READY: &str = "READY";
pub const EVENT_CONVERSATION_JOINED: &str = "CONVERSATION_JOINED";
pub const EVENT_MESSAGE_CREATE: &str = "MESSAGE_CREATE";
pub const EVENT_ERROR: &str = "ERROR";

/// Payload of a `JOIN_CONVERSATION` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinConversationRequest {
    pub event_id: i64,
    pub host_id: i64,
    pub user_id: i64,
}

/// Payload of a `SEND_MESSAGE` frame.
///
/// Clients historically attached display URLs for each media kind;
/// those fields are accepted but ignored — the server resolves URLs
/// from the persisted ids before broadcast.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_id: Option<i64>,
    #[serde(default)]
    pub video_id: Option<i64>,
    #[serde(default)]
    pub audio_id: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}
