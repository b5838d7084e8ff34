//! Dashboard report routes.

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use beneficios_engine::DashboardReport;
use serde::Serialize;

use crate::dashboard::CachedRead;
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

/// Create dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", delete(clear_handler))
        .route("/dashboard/{key}", get(report_handler))
}

/// GET /dashboard/{key} - Load a report, live or from cache.
async fn report_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CachedRead>> {
    let report: DashboardReport = key.parse()?;
    let read = state.dashboard.load(report).await?;
    Ok(Json(read))
}

/// DELETE /dashboard - Drop every cached report.
async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let cache = state
        .dashboard
        .cache()
        .ok_or(AppError::OfflineUnavailable)?;
    let removed = cache.clear().await?;
    Ok(Json(ClearResponse { removed }))
}
