//! Database operations for the sync_log table.

use beneficios_engine::{SyncAction, SyncLogEntry};
use sqlx::{Row, SqliteExecutor};

use crate::error::StoreError;

/// A stored sync log row.
#[derive(Debug)]
pub struct StoredLogEntry {
    pub id: String,
    pub operation_id: String,
    pub action: String,
    pub timestamp: i64,
    pub error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredLogEntry {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredLogEntry {
            id: row.try_get("id")?,
            operation_id: row.try_get("operation_id")?,
            action: row.try_get("action")?,
            timestamp: row.try_get("timestamp")?,
            error: row.try_get("error")?,
        })
    }
}

impl StoredLogEntry {
    pub fn into_entry(self) -> Result<SyncLogEntry, StoreError> {
        let action: SyncAction = self.action.parse().map_err(StoreError::Corrupt)?;
        Ok(SyncLogEntry {
            id: self.id,
            operation_id: self.operation_id,
            action,
            timestamp: self.timestamp.max(0) as u64,
            error: self.error,
        })
    }
}

/// Append a log row. Rows are never updated afterwards.
pub async fn append_entry<'e, E>(executor: E, entry: &SyncLogEntry) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO sync_log (id, operation_id, action, timestamp, error)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.operation_id)
    .bind(entry.action.as_str())
    .bind(entry.timestamp as i64)
    .bind(&entry.error)
    .execute(executor)
    .await?;

    Ok(())
}

/// All log rows for one operation, oldest first.
pub async fn entries_for_operation<'e, E>(
    executor: E,
    operation_id: &str,
) -> Result<Vec<StoredLogEntry>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, StoredLogEntry>(
        r#"
        SELECT id, operation_id, action, timestamp, error
        FROM sync_log
        WHERE operation_id = ?1
        ORDER BY timestamp ASC, rowid ASC
        "#,
    )
    .bind(operation_id)
    .fetch_all(executor)
    .await
}
