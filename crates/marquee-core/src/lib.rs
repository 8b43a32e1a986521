pub mod auth;
pub mod broadcaster;
pub mod error;
pub mod events;
pub mod registry;
pub mod resolver;
pub mod views;

use marquee_db::DbPool;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub event_bus: events::EventBus,
    /// Per-process broadcast group membership; never durable, never
    /// shared across instances.
    pub registry: Arc<registry::ConnectionRegistry>,
    pub config: AppConfig,
    pub shutdown: Arc<Notify>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    /// Worker id folded into generated snowflake ids.
    pub worker_id: u16,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
}

impl AppState {
    pub fn next_id(&self) -> i64 {
        marquee_util::snowflake::generate(self.config.worker_id)
    }
}
