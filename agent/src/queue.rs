//! Pending operation queue.
//!
//! Durable FIFO of writes waiting for delivery. Enqueueing, a failed attempt
//! and a delivery each append a `sync_log` row in the same transaction.
//! Moving an operation back to `pending` (recovery, requeue) is not logged.

use beneficios_engine::{
    OperationStatus, OperationType, PendingOperation, SyncAction, SyncLogEntry,
};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{self, LocalStore};
use crate::error::{StoreError, StoreResult};
use crate::now_millis;

/// Handle to the pending operation queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    store: LocalStore,
}

impl PendingQueue {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Record a new write and return its id.
    ///
    /// The type is stored verbatim; an unknown type is only detected when a
    /// drain pass tries to resolve its endpoint.
    pub async fn enqueue(&self, op_type: &str, data: Value) -> StoreResult<String> {
        let now = now_millis();
        let op = PendingOperation::new(Uuid::new_v4().to_string(), op_type, data, now);

        let mut tx = self.store.pool().begin().await?;
        db::operations::insert_operation(&mut *tx, &op).await?;
        db::sync_log::append_entry(&mut *tx, &log_entry(&op.id, SyncAction::Created, now)).await?;
        tx.commit().await?;

        tracing::debug!(op_id = %op.id, op_type = %op.op_type, "Operation enqueued");
        Ok(op.id)
    }

    /// Fetch one operation.
    pub async fn get(&self, id: &str) -> StoreResult<Option<PendingOperation>> {
        db::operations::get_operation(self.store.pool(), id)
            .await?
            .map(|row| row.into_operation())
            .transpose()
    }

    /// Operations with the given status (all of them for `None`), oldest first.
    pub async fn list_by_status(
        &self,
        status: Option<OperationStatus>,
    ) -> StoreResult<Vec<PendingOperation>> {
        let rows = db::operations::list_operations(self.store.pool(), status).await?;
        rows.into_iter().map(|row| row.into_operation()).collect()
    }

    /// Operations of one type, oldest first.
    pub async fn list_by_type(
        &self,
        op_type: OperationType,
    ) -> StoreResult<Vec<PendingOperation>> {
        let rows =
            db::operations::list_operations_by_type(self.store.pool(), op_type.as_str()).await?;
        rows.into_iter().map(|row| row.into_operation()).collect()
    }

    /// Move an operation to `status`.
    ///
    /// Passing an error records a failed attempt: `retry_count` goes up by
    /// one, the message becomes `last_error`, and a `failed` log row is
    /// written.
    pub async fn update_status(
        &self,
        id: &str,
        status: OperationStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let mut tx = self.store.pool().begin().await?;

        let current = db::operations::get_operation(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .into_operation()?;
        current.status.transition_to(status)?;

        db::operations::update_operation_status(&mut *tx, id, status, error).await?;
        if let Some(message) = error {
            let entry = log_entry(id, SyncAction::Failed, now_millis()).with_error(message);
            db::sync_log::append_entry(&mut *tx, &entry).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            op_id = %id,
            from = %current.status,
            to = %status,
            "Operation status updated"
        );
        Ok(())
    }

    /// Delete a delivered operation. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut tx = self.store.pool().begin().await?;
        let removed = db::operations::delete_operation(&mut *tx, id).await? > 0;
        if removed {
            db::sync_log::append_entry(&mut *tx, &log_entry(id, SyncAction::Synced, now_millis()))
                .await?;
        }
        tx.commit().await?;

        Ok(removed)
    }

    /// Number of operations with the given status.
    pub async fn count(&self, status: OperationStatus) -> StoreResult<u64> {
        Ok(db::operations::count_operations(self.store.pool(), status).await?)
    }

    /// Return operations left in `syncing` by an interrupted pass to
    /// `pending`. Their retry counters are not touched.
    pub async fn recover_interrupted(&self) -> StoreResult<u64> {
        let moved = db::operations::reset_interrupted_operations(self.store.pool()).await?;
        if moved > 0 {
            tracing::info!(count = moved, "Recovered operations from an interrupted sync pass");
        }
        Ok(moved)
    }

    /// Return one operation whose delivery was abandoned mid-flight to
    /// `pending`. `false` when it is no longer `syncing`.
    pub async fn release_in_flight(&self, id: &str) -> StoreResult<bool> {
        let released = db::operations::release_operation(self.store.pool(), id).await? > 0;
        if released {
            tracing::info!(op_id = %id, "Interrupted delivery returned to the queue");
        }
        Ok(released)
    }

    /// Put one failed operation back in the queue with a fresh retry budget.
    pub async fn requeue_failed(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.store.pool().begin().await?;

        let current = db::operations::get_operation(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .into_operation()?;
        if current.status != OperationStatus::Failed {
            return Err(beneficios_engine::Error::InvalidTransition {
                from: current.status,
                to: OperationStatus::Pending,
            }
            .into());
        }

        db::operations::reset_failed_operation(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(op_id = %id, "Failed operation requeued");
        Ok(())
    }

    /// Requeue every failed operation. Returns how many were moved.
    pub async fn requeue_all_failed(&self) -> StoreResult<u64> {
        let failed = self.list_by_status(Some(OperationStatus::Failed)).await?;

        let mut tx = self.store.pool().begin().await?;
        let mut moved = 0;
        for op in &failed {
            moved += db::operations::reset_failed_operation(&mut *tx, &op.id).await?;
        }
        tx.commit().await?;

        Ok(moved)
    }

    /// Audit trail of one operation, oldest first.
    pub async fn history(&self, id: &str) -> StoreResult<Vec<SyncLogEntry>> {
        let rows = db::sync_log::entries_for_operation(self.store.pool(), id).await?;
        rows.into_iter().map(|row| row.into_entry()).collect()
    }
}

fn log_entry(operation_id: &str, action: SyncAction, timestamp: u64) -> SyncLogEntry {
    SyncLogEntry::new(Uuid::new_v4().to_string(), operation_id, action, timestamp)
}
