// Herald API server
// Decision: Dry-run transport until a messaging client backend is configured
// Decision: SQLite file store; queues survive restarts, sessions are re-registered from env

use std::sync::Arc;

use anyhow::{Context, Result};
use herald_delivery::{
    DeliveryQueue, DryRunConfig, DryRunTransport, InMemorySessionRegistry, SessionHandle,
    SqliteDeliveryStore,
};
use herald_server::{router, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_DB_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_server=debug,herald_delivery=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("herald-server starting...");

    let config = ServerConfig::from_env();

    // Initialize database
    let store = SqliteDeliveryStore::connect(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .context("Failed to open delivery store")?;
    tracing::info!("Connected to database");

    let registry = Arc::new(InMemorySessionRegistry::new());
    for name in &config.sessions {
        registry.register(SessionHandle::new(name).with_authenticated(true));
    }

    let transport =
        DryRunTransport::new(DryRunConfig::default().with_latency(config.dry_run_latency));
    tracing::warn!("Using dry-run transport: messages are logged, not sent");

    if let Some(number) = &config.delivery.override_recipient {
        tracing::warn!(override_recipient = %number, "Test mode: all messages redirected");
    }

    let queue = Arc::new(DeliveryQueue::new(
        Arc::new(store),
        registry.clone(),
        Arc::new(transport),
        config.delivery.clone(),
    ));
    queue
        .start()
        .context("Failed to start delivery scheduler")?;

    let app = router(AppState::new(queue.clone(), registry));

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    queue
        .shutdown()
        .await
        .context("Delivery scheduler did not stop cleanly")?;
    tracing::info!("herald-server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining");
}
