/// One live gateway connection. The connection id doubles as the
/// registry key for broadcast group membership.
pub struct Session {
    pub user_id: i64,
    pub connection_id: String,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            connection_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Fan-out events name their recipients explicitly; deliver only
    /// when this connection is among them.
    pub fn should_receive_event(&self, target_connection_ids: &[String]) -> bool {
        target_connection_ids
            .iter()
            .any(|id| id == &self.connection_id)
    }
}
