//! Wiring of the offline layer.

use std::sync::Arc;

use beneficios_engine::RetryPolicy;

use crate::cache::DashboardCache;
use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::dashboard::DashboardReader;
use crate::db::LocalStore;
use crate::error::StoreResult;
use crate::queue::PendingQueue;
use crate::status::PwaStatus;
use crate::sync::{AutoSync, AutoSyncSettings, DrainSettings, SyncManager};
use crate::transport::SyncTransport;
use crate::writer::OperationWriter;

/// Open the local store, or `None` when it cannot be opened.
///
/// The agent keeps running without it: writes go direct-only and dashboard
/// reads are live-only.
pub async fn open_store(config: &Config) -> Option<LocalStore> {
    match LocalStore::open(&config.database_url).await {
        Ok(store) => {
            tracing::info!(url = %config.database_url, "Local store ready");
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Local store unavailable, offline support disabled");
            None
        }
    }
}

/// Every component of the offline layer, sharing one store, one transport and
/// one connectivity monitor.
pub struct OfflineStack<T> {
    pub connectivity: Arc<ConnectivityMonitor>,
    pub queue: Option<PendingQueue>,
    pub sync: Option<Arc<SyncManager<T>>>,
    pub writer: Arc<OperationWriter<T>>,
    pub dashboard: Arc<DashboardReader<T>>,
    pub status: Arc<PwaStatus<T>>,
    auto_sync_settings: AutoSyncSettings,
}

impl<T: SyncTransport> OfflineStack<T> {
    /// Build the components. Operations left `syncing` by a previous run are
    /// returned to `pending` first.
    pub async fn assemble(
        config: &Config,
        transport: Arc<T>,
        store: Option<LocalStore>,
    ) -> StoreResult<Self> {
        let connectivity = ConnectivityMonitor::new_shared(config.start_online);
        let policy = RetryPolicy::new(config.max_retries)
            .with_permanent_client_errors(config.client_errors_permanent);

        let queue = store.clone().map(PendingQueue::new);
        if let Some(queue) = &queue {
            queue.recover_interrupted().await?;
        }

        let sync = queue.clone().map(|queue| {
            Arc::new(SyncManager::new(
                queue,
                transport.clone(),
                connectivity.clone(),
                policy,
                DrainSettings::from(config),
            ))
        });

        let writer = Arc::new(OperationWriter::new(
            transport.clone(),
            connectivity.clone(),
            queue.clone(),
        ));
        let dashboard = Arc::new(DashboardReader::new(
            transport,
            connectivity.clone(),
            store.map(DashboardCache::new),
            config.dashboard_max_age,
        ));
        let status = Arc::new(PwaStatus::new(connectivity.clone(), sync.clone()));
        status.refresh().await?;

        Ok(Self {
            connectivity,
            queue,
            sync,
            writer,
            dashboard,
            status,
            auto_sync_settings: AutoSyncSettings::from(config),
        })
    }

    pub fn is_offline_ready(&self) -> bool {
        self.sync.is_some()
    }

    /// Start the automatic sync triggers. `None` without a local store.
    pub fn start_auto_sync(&self) -> Option<AutoSync> {
        self.sync
            .clone()
            .map(|sync| AutoSync::start(sync, self.auto_sync_settings))
    }
}
