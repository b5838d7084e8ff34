//! Drain pass: deliver queued operations to the remote API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beneficios_engine::{
    FailureKind, OperationStatus, PendingOperation, RetryPolicy, SyncReport,
};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{StoreError, StoreResult, TransportError};
use crate::queue::PendingQueue;
use crate::transport::SyncTransport;

/// Timing knobs of a drain pass.
#[derive(Debug, Clone, Copy)]
pub struct DrainSettings {
    /// Upper bound for one delivery, on top of the client's own timeout
    pub request_timeout: Duration,
    /// Pause between two deliveries
    pub operation_delay: Duration,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            operation_delay: Duration::from_millis(100),
        }
    }
}

impl From<&Config> for DrainSettings {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout,
            operation_delay: config.operation_delay,
        }
    }
}

/// Outcome of the most recent completed pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastSync {
    pub at: DateTime<Utc>,
    pub report: SyncReport,
}

/// "Pass in progress" flag plus bookkeeping of the last pass.
#[derive(Debug, Default)]
pub struct SyncState {
    in_progress: AtomicBool,
    last: Mutex<Option<LastSync>>,
}

impl SyncState {
    /// Take the in-progress flag. `None` if another pass holds it.
    pub fn try_begin(&self) -> Option<PassGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard { state: self })
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn last(&self) -> Option<LastSync> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, report: SyncReport) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(LastSync {
            at: Utc::now(),
            report,
        });
    }
}

/// Clears the in-progress flag when dropped, whichever way the pass ends.
#[derive(Debug)]
pub struct PassGuard<'a> {
    state: &'a SyncState,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.state.in_progress.store(false, Ordering::Release);
    }
}

/// Marks one operation as in flight. Dropped before [`settle`](Self::settle),
/// it hands the operation back to the queue, so a pass cancelled mid-request
/// does not strand it in `syncing`.
struct InFlight {
    queue: PendingQueue,
    id: Option<String>,
}

impl InFlight {
    fn new(queue: &PendingQueue, id: &str) -> Self {
        Self {
            queue: queue.clone(),
            id: Some(id.to_string()),
        }
    }

    fn settle(mut self) {
        self.id = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };

        // Drop cannot await; hand the reset to the runtime.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.queue.clone();
                handle.spawn(async move {
                    if let Err(e) = queue.release_in_flight(&id).await {
                        tracing::warn!(
                            op_id = %id,
                            error = %e,
                            "Failed to release interrupted delivery"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    op_id = %id,
                    "Delivery interrupted outside a runtime, left for startup recovery"
                );
            }
        }
    }
}

/// Delivers pending operations, one at a time, oldest first.
pub struct SyncManager<T> {
    queue: PendingQueue,
    transport: Arc<T>,
    connectivity: Arc<ConnectivityMonitor>,
    policy: RetryPolicy,
    settings: DrainSettings,
    state: SyncState,
}

impl<T: SyncTransport> SyncManager<T> {
    pub fn new(
        queue: PendingQueue,
        transport: Arc<T>,
        connectivity: Arc<ConnectivityMonitor>,
        policy: RetryPolicy,
        settings: DrainSettings,
    ) -> Self {
        Self {
            queue,
            transport,
            connectivity,
            policy,
            settings,
            state: SyncState::default(),
        }
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    pub fn is_syncing(&self) -> bool {
        self.state.is_syncing()
    }

    pub fn last_sync(&self) -> Option<LastSync> {
        self.state.last()
    }

    /// Run one drain pass.
    ///
    /// Returns a zero report without touching the network when another pass
    /// is running, when offline, or when nothing is pending. Delivery
    /// failures are recorded on the operations and counted; only store
    /// errors abort the pass.
    pub async fn sync_pending_operations(&self) -> StoreResult<SyncReport> {
        let Some(_guard) = self.state.try_begin() else {
            tracing::debug!("Sync pass already running, skipping");
            return Ok(SyncReport::default());
        };

        if !self.connectivity.is_online() {
            tracing::debug!("Offline, skipping sync pass");
            return Ok(SyncReport::default());
        }

        let pending = self.queue.list_by_status(Some(OperationStatus::Pending)).await?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        tracing::info!(count = pending.len(), "Starting sync pass");

        let mut report = SyncReport::default();
        for (index, op) in pending.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.operation_delay).await;
            }

            match self.deliver(op).await? {
                Some(true) => report.record_synced(),
                Some(false) => report.record_failed(),
                None => {}
            }
        }

        self.state.record(report);
        tracing::info!(
            synced = report.synced,
            failed = report.failed,
            "Sync pass finished"
        );

        Ok(report)
    }

    /// Deliver one operation. `None` when it changed under us and was skipped.
    ///
    /// If the future is dropped while the operation is `syncing`, the
    /// operation goes back to `pending` without using up a retry.
    async fn deliver(&self, op: &PendingOperation) -> StoreResult<Option<bool>> {
        match self
            .queue
            .update_status(&op.id, OperationStatus::Syncing, None)
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) | Err(StoreError::Engine(_)) => {
                tracing::debug!(op_id = %op.id, "Operation no longer pending, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let in_flight = InFlight::new(&self.queue, &op.id);

        let endpoint = match op.endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(op_id = %op.id, op_type = %op.op_type, "Unknown operation type");
                let status = self
                    .policy
                    .status_after_failure(op.retry_count, FailureKind::UnknownType);
                self.queue
                    .update_status(&op.id, status, Some(&e.to_string()))
                    .await?;
                in_flight.settle();
                return Ok(Some(false));
            }
        };

        let result = tokio::time::timeout(
            self.settings.request_timeout,
            self.transport.post(endpoint, &op.data),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout(self.settings.request_timeout)));

        match result {
            Ok(()) => {
                self.queue.remove(&op.id).await?;
                in_flight.settle();
                tracing::debug!(op_id = %op.id, endpoint, "Operation synced");
                Ok(Some(true))
            }
            Err(err) => {
                let status = self
                    .policy
                    .status_after_failure(op.retry_count, err.failure_kind());
                tracing::warn!(
                    op_id = %op.id,
                    endpoint,
                    attempt = op.retry_count + 1,
                    next = %status,
                    error = %err,
                    "Operation delivery failed"
                );
                self.queue
                    .update_status(&op.id, status, Some(&err.to_string()))
                    .await?;
                in_flight.settle();
                Ok(Some(false))
            }
        }
    }
}

impl<T> std::fmt::Debug for SyncManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("policy", &self.policy)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish()
    }
}
