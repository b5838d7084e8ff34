//! Beneficios Agent - offline sync layer for the benefits dashboard PWA.
//!
//! Serves the local HTTP surface the PWA shell talks to, and drains queued
//! writes to the benefits API in the background.

use std::sync::Arc;

use beneficios_agent::config::Config;
use beneficios_agent::stack::{open_store, OfflineStack};
use beneficios_agent::transport::HttpTransport;
use beneficios_agent::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beneficios_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Beneficios Agent on {} (API {})",
        config.bind_addr(),
        config.api_base_url
    );

    let store = open_store(&config).await;
    if let Some(store) = &store {
        tracing::info!(schema_version = store.schema_version().await?, "Local store migrated");
    }

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let stack = OfflineStack::assemble(&config, transport, store.clone()).await?;

    let auto_sync = stack.start_auto_sync();
    let status_refresh = stack.status.spawn_refresh(config.status_refresh_interval);

    let state = AppState::new(config.clone(), &stack);
    let app = build_router(state);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    status_refresh.abort();
    if let Some(auto_sync) = auto_sync {
        auto_sync.stop().await;
    }
    if let Some(store) = store {
        store.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
