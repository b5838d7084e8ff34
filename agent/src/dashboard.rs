//! Dashboard reads: live first, cache as fallback.

use std::sync::Arc;
use std::time::Duration;

use beneficios_engine::{DashboardReport, DataSource};
use serde::Serialize;
use serde_json::Value;

use crate::cache::DashboardCache;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{AppError, Result};
use crate::now_millis;
use crate::transport::SyncTransport;

/// A report payload and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedRead {
    pub data: Value,
    pub source: DataSource,
}

pub struct DashboardReader<T> {
    transport: Arc<T>,
    connectivity: Arc<ConnectivityMonitor>,
    cache: Option<DashboardCache>,
    max_age: Duration,
}

impl<T: SyncTransport> DashboardReader<T> {
    pub fn new(
        transport: Arc<T>,
        connectivity: Arc<ConnectivityMonitor>,
        cache: Option<DashboardCache>,
        max_age: Duration,
    ) -> Self {
        Self {
            transport,
            connectivity,
            cache,
            max_age,
        }
    }

    pub fn cache(&self) -> Option<&DashboardCache> {
        self.cache.as_ref()
    }

    /// Load a report.
    ///
    /// Online, the report is fetched and written through to the cache. When
    /// offline or when the fetch fails, the cached copy is served tagged with
    /// its age. With neither, the read fails with [`AppError::NoDataOffline`].
    pub async fn load(&self, report: DashboardReport) -> Result<CachedRead> {
        let key = report.key();

        if self.connectivity.is_online() {
            match self.transport.get(report.path()).await {
                Ok(data) => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(key, &data).await {
                            tracing::warn!(key, error = %e, "Failed to cache dashboard report");
                        }
                    }
                    return Ok(CachedRead {
                        data,
                        source: DataSource::Live,
                    });
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Live dashboard fetch failed, trying cache");
                }
            }
        }

        let cached = match &self.cache {
            Some(cache) => cache.entry(key).await?,
            None => None,
        };

        match cached {
            Some(entry) => {
                let source =
                    DataSource::from_entry(&entry, now_millis(), self.max_age.as_millis() as u64);
                Ok(CachedRead {
                    data: entry.data,
                    source,
                })
            }
            None => Err(AppError::NoDataOffline(key.to_string())),
        }
    }
}

impl<T> std::fmt::Debug for DashboardReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardReader")
            .field("max_age", &self.max_age)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
