//! PWA status facade.
//!
//! A single read-mostly view of the offline layer for the UI: connectivity,
//! queue counts, sync activity and the app update flags.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beneficios_engine::{OperationStatus, SyncReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{AppError, Result, StoreResult};
use crate::queue::PendingQueue;
use crate::sync::SyncManager;
use crate::transport::SyncTransport;

/// Point-in-time status of the offline layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_online: bool,
    pub pending_operations: u64,
    pub failed_operations: u64,
    pub is_syncing: bool,
    pub is_update_available: bool,
    pub needs_refresh: bool,
    pub is_offline_ready: bool,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<SyncReport>,
}

/// Status facade over the connectivity monitor, queue and sync manager.
pub struct PwaStatus<T> {
    connectivity: Arc<ConnectivityMonitor>,
    sync: Option<Arc<SyncManager<T>>>,
    pending: AtomicU64,
    failed: AtomicU64,
    update_available: AtomicBool,
    needs_refresh: AtomicBool,
}

impl<T: SyncTransport> PwaStatus<T> {
    /// `sync` is `None` when the local store could not be opened.
    pub fn new(connectivity: Arc<ConnectivityMonitor>, sync: Option<Arc<SyncManager<T>>>) -> Self {
        Self {
            connectivity,
            sync,
            pending: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            update_available: AtomicBool::new(false),
            needs_refresh: AtomicBool::new(false),
        }
    }

    fn queue(&self) -> Option<&PendingQueue> {
        self.sync.as_deref().map(|sync| sync.queue())
    }

    /// Current status. Counts are as of the last [`refresh`](Self::refresh).
    pub fn snapshot(&self) -> StatusSnapshot {
        let last = self.sync.as_ref().and_then(|sync| sync.last_sync());
        StatusSnapshot {
            is_online: self.connectivity.is_online(),
            pending_operations: self.pending.load(Ordering::Relaxed),
            failed_operations: self.failed.load(Ordering::Relaxed),
            is_syncing: self.sync.as_ref().is_some_and(|sync| sync.is_syncing()),
            is_update_available: self.update_available.load(Ordering::Relaxed),
            needs_refresh: self.needs_refresh.load(Ordering::Relaxed),
            is_offline_ready: self.sync.is_some(),
            last_sync: last.map(|l| l.at),
            last_report: last.map(|l| l.report),
        }
    }

    /// Recount queued and failed operations from the store.
    ///
    /// Operations in flight still count as pending until they are delivered.
    pub async fn refresh(&self) -> StoreResult<StatusSnapshot> {
        if let Some(queue) = self.queue() {
            let pending = queue.count(OperationStatus::Pending).await?
                + queue.count(OperationStatus::Syncing).await?;
            let failed = queue.count(OperationStatus::Failed).await?;
            self.pending.store(pending, Ordering::Relaxed);
            self.failed.store(failed, Ordering::Relaxed);
        }
        Ok(self.snapshot())
    }

    /// Run a drain pass now. Fails with [`AppError::Offline`] when offline.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        if !self.connectivity.is_online() {
            return Err(AppError::Offline);
        }
        let sync = self.sync.as_ref().ok_or(AppError::OfflineUnavailable)?;

        let report = sync.sync_pending_operations().await?;
        self.refresh().await?;
        Ok(report)
    }

    /// Record that a new app version is waiting.
    pub fn mark_update_available(&self) {
        self.update_available.store(true, Ordering::Relaxed);
        self.needs_refresh.store(true, Ordering::Relaxed);
        tracing::info!("App update available");
    }

    /// Acknowledge a pending update. Returns whether one was pending.
    pub fn update_app(&self) -> bool {
        let was_available = self.update_available.swap(false, Ordering::Relaxed);
        self.needs_refresh.store(false, Ordering::Relaxed);
        if was_available {
            tracing::info!("App update applied");
        }
        was_available
    }
}

impl<T: SyncTransport> PwaStatus<T> {
    /// Refresh the counts every `every` until the handle is aborted.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let status = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = status.refresh().await {
                    tracing::warn!(error = %e, "Status refresh failed");
                }
            }
        })
    }
}

impl<T> std::fmt::Debug for PwaStatus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PwaStatus")
            .field("connectivity", &self.connectivity)
            .field("offline_ready", &self.sync.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpTransport;

    fn detached(online: bool) -> PwaStatus<HttpTransport> {
        PwaStatus::new(ConnectivityMonitor::new_shared(online), None)
    }

    #[test]
    fn update_flags_round_trip() {
        let status = detached(true);
        assert!(!status.update_app());

        status.mark_update_available();
        let snapshot = status.snapshot();
        assert!(snapshot.is_update_available);
        assert!(snapshot.needs_refresh);

        assert!(status.update_app());
        let snapshot = status.snapshot();
        assert!(!snapshot.is_update_available);
        assert!(!snapshot.needs_refresh);
    }

    #[tokio::test]
    async fn sync_now_offline_is_rejected() {
        let status = detached(false);
        assert!(matches!(status.sync_now().await, Err(AppError::Offline)));
    }

    #[tokio::test]
    async fn without_store_not_offline_ready() {
        let status = detached(true);
        let snapshot = status.refresh().await.unwrap();
        assert!(!snapshot.is_offline_ready);
        assert_eq!(snapshot.pending_operations, 0);
        assert!(matches!(status.sync_now().await, Err(AppError::OfflineUnavailable)));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(detached(true).snapshot()).unwrap();
        assert_eq!(json["isOnline"], true);
        assert_eq!(json["isOfflineReady"], false);
        assert!(json["lastSync"].is_null());
        assert!(json.get("lastReport").is_none());
    }
}
