//! Sync status, manual sync and connectivity signal routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use beneficios_engine::SyncReport;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::StatusSnapshot;
use crate::AppState;

/// Body of `POST /connectivity`, fed from the shell's online/offline events.
#[derive(Debug, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed: bool,
}

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status_handler))
        .route("/sync", post(sync_handler))
        .route("/connectivity", post(connectivity_handler))
}

/// GET /status - Current offline status with fresh counts.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusSnapshot>> {
    let snapshot = state.status.refresh().await?;
    Ok(Json(snapshot))
}

/// POST /sync - Run a drain pass now.
async fn sync_handler(State(state): State<AppState>) -> Result<Json<SyncReport>> {
    let report = state.status.sync_now().await?;
    Ok(Json(report))
}

/// POST /connectivity - Report an online/offline transition.
async fn connectivity_handler(
    State(state): State<AppState>,
    Json(request): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let changed = state.connectivity.set_online(request.online);
    Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
        changed,
    })
}
