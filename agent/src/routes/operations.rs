//! Write path and pending queue routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use beneficios_engine::{OperationStatus, PendingOperation, SyncLogEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::queue::PendingQueue;
use crate::writer::SubmitOutcome;
use crate::AppState;

/// Body of `POST /operations`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub op_type: String,
    pub data: Value,
}

/// Query of `GET /operations`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequeueResponse {
    pub requeued: u64,
}

/// Create operation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/operations", get(list_handler).post(submit_handler))
        .route("/operations/failed/retry", post(retry_all_handler))
        .route("/operations/{id}/retry", post(retry_handler))
        .route("/operations/{id}/history", get(history_handler))
}

fn queue(state: &AppState) -> Result<&PendingQueue> {
    state.queue.as_ref().ok_or(AppError::OfflineUnavailable)
}

/// POST /operations - Submit a write; delivered now or queued.
async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitOutcome>)> {
    let outcome = state.writer.submit(&request.op_type, request.data).await?;
    let status = match outcome {
        SubmitOutcome::Delivered => StatusCode::OK,
        SubmitOutcome::Queued { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

/// GET /operations - List queued operations, optionally by status.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PendingOperation>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OperationStatus>)
        .transpose()?;
    let operations = queue(&state)?.list_by_status(status).await?;
    Ok(Json(operations))
}

/// GET /operations/{id}/history - Sync log of one operation.
async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SyncLogEntry>>> {
    let history = queue(&state)?.history(&id).await?;
    if history.is_empty() {
        return Err(AppError::NotFound(format!("No history for operation {}", id)));
    }
    Ok(Json(history))
}

/// POST /operations/{id}/retry - Requeue one failed operation.
async fn retry_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PendingOperation>> {
    let queue = queue(&state)?;
    queue.requeue_failed(&id).await?;
    let operation = queue
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Operation not found: {}", id)))?;
    state.status.refresh().await?;
    Ok(Json(operation))
}

/// POST /operations/failed/retry - Requeue every failed operation.
async fn retry_all_handler(State(state): State<AppState>) -> Result<Json<RequeueResponse>> {
    let requeued = queue(&state)?.requeue_all_failed().await?;
    state.status.refresh().await?;
    Ok(Json(RequeueResponse { requeued }))
}
