//! Beneficios Agent - offline sync layer for the benefits dashboard PWA.
//!
//! Runs next to the PWA shell and keeps it usable without a network: dashboard
//! reports are cached locally, writes made while offline are queued in SQLite
//! and delivered to the benefits API once connectivity returns. The shell talks
//! to the agent over a small local HTTP surface.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod queue;
pub mod routes;
pub mod stack;
pub mod status;
pub mod sync;
pub mod transport;
pub mod writer;

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::dashboard::DashboardReader;
use crate::queue::PendingQueue;
use crate::stack::OfflineStack;
use crate::status::PwaStatus;
use crate::transport::HttpTransport;
use crate::writer::OperationWriter;

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> beneficios_engine::Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub queue: Option<PendingQueue>,
    pub writer: Arc<OperationWriter<HttpTransport>>,
    pub dashboard: Arc<DashboardReader<HttpTransport>>,
    pub status: Arc<PwaStatus<HttpTransport>>,
}

impl AppState {
    pub fn new(config: Config, stack: &OfflineStack<HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            connectivity: stack.connectivity.clone(),
            queue: stack.queue.clone(),
            writer: stack.writer.clone(),
            dashboard: stack.dashboard.clone(),
            status: stack.status.clone(),
        }
    }
}

/// Build the local HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
