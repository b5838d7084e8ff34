//! Dashboard cache.
//!
//! Key-value store of report payloads with a write timestamp. One entry per
//! key; the latest write wins.

use std::time::Duration;

use beneficios_engine::{CacheEntry, Timestamp};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{self, LocalStore};
use crate::error::{StoreError, StoreResult};
use crate::now_millis;

#[derive(Debug, Clone)]
pub struct DashboardCache {
    store: LocalStore,
}

impl DashboardCache {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Store `data` under `key`, stamped with the current time.
    pub async fn put<T: Serialize>(&self, key: &str, data: &T) -> StoreResult<()> {
        let value = serde_json::to_value(data)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?;
        self.put_entry(&CacheEntry::new(key, value, now_millis())).await
    }

    /// Store a prepared entry as is.
    pub async fn put_entry(&self, entry: &CacheEntry) -> StoreResult<()> {
        db::cache::upsert_entry(self.store.pool(), entry).await?;
        tracing::debug!(key = %entry.id, "Dashboard cache updated");
        Ok(())
    }

    /// The cached payload under `key`, regardless of age.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.entry(key).await? {
            Some(entry) => serde_json::from_value(entry.data)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// The full entry under `key`, including its timestamp.
    pub async fn entry(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(db::cache::get_entry(self.store.pool(), key)
            .await?
            .map(|row| row.into_entry()))
    }

    /// Whether an entry exists and is no older than `max_age`.
    pub async fn is_valid(&self, key: &str, max_age: Duration) -> StoreResult<bool> {
        self.is_valid_at(key, max_age, now_millis()).await
    }

    pub async fn is_valid_at(
        &self,
        key: &str,
        max_age: Duration,
        now: Timestamp,
    ) -> StoreResult<bool> {
        Ok(self
            .entry(key)
            .await?
            .is_some_and(|entry| entry.is_fresh(now, max_age.as_millis() as u64)))
    }

    /// Cached keys and their write times.
    pub async fn keys(&self) -> StoreResult<Vec<(String, Timestamp)>> {
        let rows = db::cache::list_keys(self.store.pool()).await?;
        Ok(rows
            .into_iter()
            .map(|(key, timestamp)| (key, timestamp.max(0) as u64))
            .collect())
    }

    /// Remove every entry. Returns how many were removed.
    pub async fn clear(&self) -> StoreResult<u64> {
        let removed = db::cache::clear_entries(self.store.pool()).await?;
        tracing::info!(removed, "Dashboard cache cleared");
        Ok(removed)
    }
}
