//! Unified error handling for the agent.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beneficios_engine::FailureKind;
use serde::Serialize;

/// Errors from the durable local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("operation not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Engine(#[from] beneficios_engine::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors talking to the remote API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid HTTP client configuration: {0}")]
    Client(String),
}

impl TransportError {
    /// How the retry policy should see this failure.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::Status { status, .. } => FailureKind::from_status(*status),
            TransportError::Network(_) | TransportError::Decode(_) | TransportError::Client(_) => {
                FailureKind::Network
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.failure_kind().is_transient()
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] beneficios_engine::Error),

    #[error("Remote API error: {0}")]
    Transport(#[from] TransportError),

    #[error("Rejected by remote API (HTTP {status})")]
    Rejected { status: u16, body: String },

    #[error("Offline")]
    Offline,

    #[error("Offline support unavailable")]
    OfflineUnavailable,

    #[error("No data available offline for {0}")]
    NoDataOffline(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Store(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                format!("Operation not found: {}", id),
                None,
            ),
            AppError::Store(StoreError::Engine(e)) | AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Local store error".to_string(),
                    None,
                )
            }
            AppError::Transport(e) => {
                tracing::warn!("Remote API error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Remote API unavailable".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Rejected { status, body } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Rejected by remote API (HTTP {})", status),
                Some(body.clone()).filter(|b| !b.is_empty()),
            ),
            AppError::Offline
            | AppError::OfflineUnavailable
            | AppError::NoDataOffline(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
