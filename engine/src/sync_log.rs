//! Append-only audit trail of queue activity.

use crate::{OperationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happened to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Synced,
    Failed,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Created => "created",
            SyncAction::Synced => "synced",
            SyncAction::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SyncAction::Created),
            "synced" => Ok(SyncAction::Synced),
            "failed" => Ok(SyncAction::Failed),
            other => Err(format!("unknown sync action: {}", other)),
        }
    }
}

/// One row of the sync log.
///
/// `operation_id` is a back-reference only; the entry outlives the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: String,
    pub operation_id: OperationId,
    pub action: SyncAction,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncLogEntry {
    pub fn new(
        id: impl Into<String>,
        operation_id: impl Into<OperationId>,
        action: SyncAction,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            operation_id: operation_id.into(),
            action,
            timestamp,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
