//! Pending operations and their lifecycle.
//!
//! A pending operation is a user-initiated write recorded locally so it can be
//! delivered to the remote API later. The payload is opaque to the engine; only
//! the `op_type` discriminator matters, because it selects the endpoint.

use crate::{error::Result, Error, OperationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of failed attempts after which an operation becomes `failed`.
pub const MAX_RETRIES: u32 = 3;

/// Lifecycle status of a pending operation.
///
/// Terminal success is not a status: a delivered operation is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Waiting for the next drain pass
    Pending,
    /// Being delivered by the current drain pass
    Syncing,
    /// Gave up; only a manual requeue brings it back
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Syncing => "syncing",
            OperationStatus::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// - `pending -> syncing`: a drain pass picks the operation up
    /// - `syncing -> pending`: retryable failure, or an interrupted pass
    /// - `syncing -> failed`: attempts exhausted or a permanent failure
    /// - `failed -> pending`: manual requeue
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        matches!(
            (self, next),
            (OperationStatus::Pending, OperationStatus::Syncing)
                | (OperationStatus::Syncing, OperationStatus::Pending)
                | (OperationStatus::Syncing, OperationStatus::Failed)
                | (OperationStatus::Failed, OperationStatus::Pending)
        )
    }

    /// Validate a transition, returning the target status on success.
    pub fn transition_to(&self, next: OperationStatus) -> Result<OperationStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(OperationStatus::Pending),
            "syncing" => Ok(OperationStatus::Syncing),
            "failed" => Ok(OperationStatus::Failed),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// The closed set of operation types the remote API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Benefit request (`solicitacao`)
    Solicitacao,
    /// Machine-hours registration (`hora_maquina`)
    HoraMaquina,
}

impl OperationType {
    pub const ALL: [OperationType; 2] = [OperationType::Solicitacao, OperationType::HoraMaquina];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Solicitacao => "solicitacao",
            OperationType::HoraMaquina => "hora_maquina",
        }
    }

    /// API path operations of this type are posted to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            OperationType::Solicitacao => "/solicitacoes",
            OperationType::HoraMaquina => "/horas-maquina",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solicitacao" => Ok(OperationType::Solicitacao),
            "hora_maquina" => Ok(OperationType::HoraMaquina),
            other => Err(Error::UnknownOperationType(other.to_string())),
        }
    }
}

/// Resolve a raw type discriminator to its endpoint.
pub fn resolve_endpoint(op_type: &str) -> Result<&'static str> {
    op_type.parse::<OperationType>().map(|t| t.endpoint())
}

/// A write waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Client-generated identifier, stable for the operation's lifetime
    pub id: OperationId,
    /// Raw type discriminator as stored
    #[serde(rename = "type")]
    pub op_type: String,
    /// Request body posted verbatim
    pub data: serde_json::Value,
    /// Enqueue time, never reset on retry
    pub created_at: Timestamp,
    pub status: OperationStatus,
    pub retry_count: u32,
    /// Message of the most recent failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingOperation {
    /// Create a freshly enqueued operation.
    pub fn new(
        id: impl Into<OperationId>,
        op_type: impl Into<String>,
        data: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            op_type: op_type.into(),
            data,
            created_at,
            status: OperationStatus::Pending,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Parse the stored discriminator.
    pub fn operation_type(&self) -> Result<OperationType> {
        self.op_type.parse()
    }

    /// Endpoint this operation is delivered to.
    pub fn endpoint(&self) -> Result<&'static str> {
        resolve_endpoint(&self.op_type)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.status == OperationStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OperationStatus::Pending,
            OperationStatus::Syncing,
            OperationStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<OperationStatus>().unwrap(), status);
        }
        assert!(matches!(
            "done".parse::<OperationStatus>(),
            Err(Error::InvalidStatus(_))
        ));
    }

    #[test]
    fn legal_transitions() {
        use OperationStatus::*;
        assert!(Pending.can_transition_to(Syncing));
        assert!(Syncing.can_transition_to(Pending));
        assert!(Syncing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
    }

    #[test]
    fn illegal_transitions() {
        use OperationStatus::*;
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Syncing));
        assert!(!Syncing.can_transition_to(Syncing));

        let err = Failed.transition_to(Syncing).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition {
                from: Failed,
                to: Syncing
            }
        );
    }

    #[test]
    fn endpoints_are_resolved() {
        assert_eq!(resolve_endpoint("solicitacao").unwrap(), "/solicitacoes");
        assert_eq!(resolve_endpoint("hora_maquina").unwrap(), "/horas-maquina");
        assert_eq!(
            resolve_endpoint("vistoria"),
            Err(Error::UnknownOperationType("vistoria".into()))
        );
    }

    #[test]
    fn new_operation_defaults() {
        let op = PendingOperation::new("op-1", "solicitacao", json!({"pessoaId": 5}), 1000);
        assert!(op.is_pending());
        assert_eq!(op.retry_count, 0);
        assert_eq!(op.created_at, 1000);
        assert_eq!(op.operation_type().unwrap(), OperationType::Solicitacao);
    }

    #[test]
    fn serializes_type_field() {
        let op = PendingOperation::new("op-1", "hora_maquina", json!({"horas": 4}), 1000);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "hora_maquina");
        assert_eq!(value["retryCount"], 0);
        assert_eq!(value["status"], "pending");
        assert!(value.get("lastError").is_none());
    }
}
