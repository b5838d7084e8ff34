//! Database operations for the pending_operations table.

use beneficios_engine::{OperationStatus, PendingOperation};
use sqlx::types::Json;
use sqlx::{Row, SqliteExecutor};

use crate::error::StoreError;

/// A stored pending operation row.
#[derive(Debug)]
pub struct StoredOperation {
    pub id: String,
    pub op_type: String,
    pub data: Json<serde_json::Value>,
    pub created_at: i64,
    pub status: String,
    pub retry_count: i64,
    pub last_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredOperation {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOperation {
            id: row.try_get("id")?,
            op_type: row.try_get("op_type")?,
            data: row.try_get("data")?,
            created_at: row.try_get("created_at")?,
            status: row.try_get("status")?,
            retry_count: row.try_get("retry_count")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

impl StoredOperation {
    /// Convert database row to an engine PendingOperation.
    pub fn into_operation(self) -> Result<PendingOperation, StoreError> {
        let status: OperationStatus = self
            .status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("{}: status '{}'", self.id, self.status)))?;

        Ok(PendingOperation {
            id: self.id,
            op_type: self.op_type,
            data: self.data.0,
            created_at: self.created_at.max(0) as u64,
            status,
            retry_count: self.retry_count.max(0) as u32,
            last_error: self.last_error,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, op_type, data, created_at, status, retry_count, last_error FROM pending_operations";

/// Insert a new operation.
pub async fn insert_operation<'e, E>(executor: E, op: &PendingOperation) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO pending_operations (
            id, op_type, data, created_at, status, retry_count, last_error
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&op.id)
    .bind(&op.op_type)
    .bind(Json(&op.data))
    .bind(op.created_at as i64)
    .bind(op.status.as_str())
    .bind(op.retry_count as i64)
    .bind(&op.last_error)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get an operation by ID.
pub async fn get_operation<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<StoredOperation>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, StoredOperation>(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// List operations, optionally filtered by status, oldest first.
///
/// Rows enqueued within the same millisecond keep insertion order.
pub async fn list_operations<'e, E>(
    executor: E,
    status: Option<OperationStatus>,
) -> Result<Vec<StoredOperation>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    match status {
        Some(status) => {
            sqlx::query_as::<_, StoredOperation>(&format!(
                "{} WHERE status = ?1 ORDER BY created_at ASC, rowid ASC",
                SELECT_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as::<_, StoredOperation>(&format!(
                "{} ORDER BY created_at ASC, rowid ASC",
                SELECT_COLUMNS
            ))
            .fetch_all(executor)
            .await
        }
    }
}

/// List operations of one type, oldest first.
pub async fn list_operations_by_type<'e, E>(
    executor: E,
    op_type: &str,
) -> Result<Vec<StoredOperation>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, StoredOperation>(&format!(
        "{} WHERE op_type = ?1 ORDER BY created_at ASC, rowid ASC",
        SELECT_COLUMNS
    ))
    .bind(op_type)
    .fetch_all(executor)
    .await
}

/// Set the status of an operation.
///
/// A non-empty `error` records a failed attempt: the retry counter goes up
/// by one and the message is kept as `last_error`.
pub async fn update_operation_status<'e, E>(
    executor: E,
    id: &str,
    status: OperationStatus,
    error: Option<&str>,
) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE pending_operations
        SET status = ?1,
            retry_count = retry_count + CASE WHEN ?2 IS NULL THEN 0 ELSE 1 END,
            last_error = COALESCE(?2, last_error)
        WHERE id = ?3
        "#,
    )
    .bind(status.as_str())
    .bind(error)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Put a failed operation back in the queue with a fresh retry budget.
pub async fn reset_failed_operation<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE pending_operations
        SET status = 'pending', retry_count = 0, last_error = NULL
        WHERE id = ?1 AND status = 'failed'
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Move every `syncing` operation back to `pending` without touching its
/// retry counter. Returns the number of rows moved.
pub async fn reset_interrupted_operations<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE pending_operations SET status = 'pending' WHERE status = 'syncing'",
    )
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Move one operation back to `pending` if it is still `syncing`.
pub async fn release_operation<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE pending_operations SET status = 'pending' WHERE id = ?1 AND status = 'syncing'",
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Delete an operation.
pub async fn delete_operation<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM pending_operations WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Count operations with the given status.
pub async fn count_operations<'e, E>(
    executor: E,
    status: OperationStatus,
) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pending_operations WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(executor)
            .await?;

    Ok(count.max(0) as u64)
}
