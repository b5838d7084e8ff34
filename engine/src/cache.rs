//! Dashboard cache entries and the freshness rule.
//!
//! The cache is cache-aside with fallback: live data is preferred and the
//! cache is only read when the network fails. Staleness is advisory; an old
//! entry is still served, just tagged as stale.

use crate::{error::Result, CacheKey, Error, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cached dashboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Logical cache key
    pub id: CacheKey,
    /// Report payload, stored verbatim
    pub data: serde_json::Value,
    /// Time of the last write (milliseconds since epoch)
    pub timestamp: Timestamp,
}

impl CacheEntry {
    pub fn new(id: impl Into<CacheKey>, data: serde_json::Value, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            data,
            timestamp,
        }
    }

    /// Age of the entry at `now`. Entries stamped in the future have age zero.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// `now - timestamp <= max_age_ms`
    pub fn is_fresh(&self, now: Timestamp, max_age_ms: u64) -> bool {
        self.age(now) <= max_age_ms
    }
}

/// Where a dashboard read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum DataSource {
    /// Fetched from the API during this read
    Live,
    /// Served from the local cache after the live fetch was impossible
    #[serde(rename_all = "camelCase")]
    Cache { cached_at: Timestamp, stale: bool },
}

impl DataSource {
    /// Tag for a cache hit judged against `max_age_ms`.
    pub fn from_entry(entry: &CacheEntry, now: Timestamp, max_age_ms: u64) -> Self {
        DataSource::Cache {
            cached_at: entry.timestamp,
            stale: !entry.is_fresh(now, max_age_ms),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, DataSource::Live)
    }
}

/// Dashboard reports known to the PWA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardReport {
    EstatisticasGerais,
    PorPrograma,
    PorStatus,
    SolicitacoesRecentes,
}

impl DashboardReport {
    pub const ALL: [DashboardReport; 4] = [
        DashboardReport::EstatisticasGerais,
        DashboardReport::PorPrograma,
        DashboardReport::PorStatus,
        DashboardReport::SolicitacoesRecentes,
    ];

    /// Cache key the report is stored under.
    pub fn key(&self) -> &'static str {
        match self {
            DashboardReport::EstatisticasGerais => "ESTATISTICAS_GERAIS",
            DashboardReport::PorPrograma => "POR_PROGRAMA",
            DashboardReport::PorStatus => "POR_STATUS",
            DashboardReport::SolicitacoesRecentes => "SOLICITACOES_RECENTES",
        }
    }

    /// API path the report is fetched from.
    pub fn path(&self) -> &'static str {
        match self {
            DashboardReport::EstatisticasGerais => "/dashboard/estatisticas-gerais",
            DashboardReport::PorPrograma => "/dashboard/por-programa",
            DashboardReport::PorStatus => "/dashboard/por-status",
            DashboardReport::SolicitacoesRecentes => "/dashboard/solicitacoes-recentes",
        }
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DashboardReport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DashboardReport::ALL
            .into_iter()
            .find(|report| report.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownReport(s.to_string()))
    }
}
