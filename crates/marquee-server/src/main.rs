use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marquee=info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    ensure_data_dirs(&config);

    let db = marquee_db::create_pool(&config.database.url, config.database.max_connections).await?;
    marquee_db::run_migrations(&db).await?;

    let shutdown_notify = Arc::new(tokio::sync::Notify::new());

    let state = marquee_core::AppState {
        db,
        event_bus: marquee_core::events::EventBus::default(),
        registry: Arc::new(marquee_core::registry::ConnectionRegistry::new()),
        config: marquee_core::AppConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_expiry_seconds: config.auth.jwt_expiry_seconds,
            worker_id: config.gateway.worker_id,
            heartbeat_interval_ms: config.gateway.heartbeat_interval_ms,
            heartbeat_timeout_ms: config.gateway.heartbeat_timeout_ms,
        },
        shutdown: shutdown_notify.clone(),
    };

    let app = marquee_ws::gateway_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        "marquee gateway listening on http://{}",
        config.server.bind_address
    );
    tracing::info!("database: {}", config.database.url);

    let shutdown_signal = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down (ctrl-c)...");
            }
            _ = shutdown_notify.notified() => {
                tracing::info!("Shutting down (requested)...");
            }
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// Ensure the database parent directory exists before the pool opens.
fn ensure_data_dirs(config: &config::Config) {
    if let Some(db_path) = config
        .database
        .url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
    }
}
