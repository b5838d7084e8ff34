//! Local store handle: connection pool and schema migrations.

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{StoreError, StoreResult};

/// Embedded schema migrations. The highest applied version is the schema version.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Handle to the durable local store.
///
/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (or create) the store and bring its schema up to date.
    ///
    /// Safe to call on an existing database: migrations that already ran are
    /// skipped and existing rows are left alone.
    pub async fn open(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Self::init(pool).await
    }

    /// Open a private in-memory store. Used by tests and when no file is wanted.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // An in-memory database lives as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Highest applied migration version.
    pub async fn schema_version(&self) -> StoreResult<i64> {
        let (version,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(version)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_runs_migrations() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), 1);

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
             AND name IN ('dashboard_cache', 'pending_operations', 'sync_log')",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn pending_operations_are_indexed() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let indexes: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND tbl_name = 'pending_operations' AND name LIKE 'idx_%'
             ORDER BY name",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();

        let names: Vec<_> = indexes.into_iter().map(|(n,)| n).collect();
        assert_eq!(
            names,
            vec!["idx_pending_operations_status", "idx_pending_operations_type"]
        );
    }

    #[tokio::test]
    async fn rerunning_migrations_is_a_no_op() {
        let store = LocalStore::open_in_memory().await.unwrap();
        MIGRATOR.run(store.pool()).await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_path_is_unavailable() {
        let result = LocalStore::open("sqlite:///nonexistent-dir/beneficios/offline.db").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
