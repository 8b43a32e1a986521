use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("event not found")]
    EventNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("conversation not found")]
    ConversationNotFound,
    #[error("host is not the event creator")]
    HostNotEventCreator,
    #[error("database error: {0}")]
    Database(#[from] marquee_db::DbError),
}

impl CoreError {
    /// Stable code carried in gateway ERROR frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            Self::HostNotEventCreator => "HOST_NOT_EVENT_CREATOR",
            Self::Database(_) => "INTERNAL",
        }
    }
}
