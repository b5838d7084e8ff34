//! App update routes.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::status::StatusSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub updated: bool,
}

/// Create app update routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/app/update-available", post(update_available_handler))
        .route("/app/update", post(update_handler))
}

/// POST /app/update-available - The update check found a new version.
async fn update_available_handler(State(state): State<AppState>) -> Json<StatusSnapshot> {
    state.status.mark_update_available();
    Json(state.status.snapshot())
}

/// POST /app/update - Apply the pending update.
async fn update_handler(State(state): State<AppState>) -> Json<UpdateResponse> {
    Json(UpdateResponse {
        updated: state.status.update_app(),
    })
}
