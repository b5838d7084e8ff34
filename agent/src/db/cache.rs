//! Database operations for the dashboard_cache table.

use beneficios_engine::CacheEntry;
use sqlx::types::Json;
use sqlx::{Row, SqliteExecutor};

/// A stored cache row.
#[derive(Debug)]
pub struct StoredCacheEntry {
    pub id: String,
    pub data: Json<serde_json::Value>,
    pub timestamp: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredCacheEntry {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredCacheEntry {
            id: row.try_get("id")?,
            data: row.try_get("data")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

impl StoredCacheEntry {
    pub fn into_entry(self) -> CacheEntry {
        CacheEntry::new(self.id, self.data.0, self.timestamp.max(0) as u64)
    }
}

/// Upsert an entry: one row per key, the latest write wins.
pub async fn upsert_entry<'e, E>(executor: E, entry: &CacheEntry) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO dashboard_cache (id, data, timestamp)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET
            data = excluded.data,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(&entry.id)
    .bind(Json(&entry.data))
    .bind(entry.timestamp as i64)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get an entry by key.
pub async fn get_entry<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<StoredCacheEntry>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, StoredCacheEntry>(
        "SELECT id, data, timestamp FROM dashboard_cache WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Count entries stored under `id` (0 or 1).
pub async fn count_entries<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dashboard_cache WHERE id = ?1")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(count.max(0) as u64)
}

/// List every cached key with its write time.
pub async fn list_keys<'e, E>(executor: E) -> Result<Vec<(String, i64)>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as("SELECT id, timestamp FROM dashboard_cache ORDER BY id ASC")
        .fetch_all(executor)
        .await
}

/// Delete every entry.
pub async fn clear_entries<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM dashboard_cache")
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
