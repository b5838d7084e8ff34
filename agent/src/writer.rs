//! Write path: deliver now when possible, queue otherwise.

use std::sync::Arc;

use beneficios_engine::{FailureKind, OperationType};
use serde::Serialize;
use serde_json::Value;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{AppError, Result, TransportError};
use crate::queue::PendingQueue;
use crate::transport::SyncTransport;

/// What happened to a submitted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    /// Accepted by the remote API
    Delivered,
    /// Stored locally for a later drain pass
    Queued { id: String },
}

pub struct OperationWriter<T> {
    transport: Arc<T>,
    connectivity: Arc<ConnectivityMonitor>,
    queue: Option<PendingQueue>,
}

impl<T: SyncTransport> OperationWriter<T> {
    pub fn new(
        transport: Arc<T>,
        connectivity: Arc<ConnectivityMonitor>,
        queue: Option<PendingQueue>,
    ) -> Self {
        Self {
            transport,
            connectivity,
            queue,
        }
    }

    /// Submit a user write.
    ///
    /// Online, the write is posted directly; a retryable failure falls back to
    /// the queue while a rejection is returned to the caller. Offline, the
    /// write is queued.
    pub async fn submit(&self, op_type: &str, data: Value) -> Result<SubmitOutcome> {
        let kind: OperationType = op_type.parse()?;

        if self.connectivity.is_online() {
            match self.transport.post(kind.endpoint(), &data).await {
                Ok(()) => return Ok(SubmitOutcome::Delivered),
                Err(TransportError::Status { status, body })
                    if !FailureKind::from_status(status).is_transient() =>
                {
                    return Err(AppError::Rejected { status, body });
                }
                Err(e) => {
                    tracing::warn!(op_type = %kind, error = %e, "Direct delivery failed, queueing");
                }
            }
        }

        let queue = self.queue.as_ref().ok_or(AppError::OfflineUnavailable)?;
        let id = queue.enqueue(kind.as_str(), data).await?;
        Ok(SubmitOutcome::Queued { id })
    }
}

impl<T> std::fmt::Debug for OperationWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationWriter")
            .field("offline_ready", &self.queue.is_some())
            .finish()
    }
}
