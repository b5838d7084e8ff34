//! Edge case tests for beneficios-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use beneficios_engine::{
    CacheEntry, DashboardReport, DataSource, Error, FailureKind, OperationStatus, OperationType,
    PendingOperation, RetryPolicy, MAX_RETRIES,
};
use serde_json::json;

// ============================================================================
// Operation Types
// ============================================================================

#[test]
fn every_operation_type_has_an_endpoint() {
    for op_type in OperationType::ALL {
        let op = PendingOperation::new("op", op_type.as_str(), json!({}), 0);
        assert_eq!(op.endpoint().unwrap(), op_type.endpoint());
        assert!(op_type.endpoint().starts_with('/'));
    }
}

#[test]
fn type_discriminator_is_case_sensitive() {
    let op = PendingOperation::new("op", "Solicitacao", json!({}), 0);
    assert_eq!(
        op.endpoint(),
        Err(Error::UnknownOperationType("Solicitacao".into()))
    );
}

#[test]
fn empty_type_is_unknown() {
    let op = PendingOperation::new("op", "", json!({}), 0);
    assert!(matches!(
        op.operation_type(),
        Err(Error::UnknownOperationType(t)) if t.is_empty()
    ));
}

// ============================================================================
// Payloads
// ============================================================================

#[test]
fn payload_is_kept_verbatim() {
    let data = json!({
        "pessoaId": 5,
        "programaId": 2,
        "observacao": "Solicitação de calcário, área 3",
        "anexos": [null, {"nested": [1, 2.5, true]}],
    });
    let op = PendingOperation::new("op-1", "solicitacao", data.clone(), 1);

    let encoded = serde_json::to_string(&op).unwrap();
    let decoded: PendingOperation = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.data, data);
    assert_eq!(decoded, op);
}

#[test]
fn null_payload_is_allowed() {
    let op = PendingOperation::new("op-1", "hora_maquina", serde_json::Value::Null, 1);
    assert!(op.data.is_null());
}

#[test]
fn stored_operation_without_last_error_deserializes() {
    let json = r#"{
        "id": "op-9",
        "type": "solicitacao",
        "data": {"pessoaId": 1},
        "createdAt": 1706745600000,
        "status": "failed",
        "retryCount": 3
    }"#;
    let op: PendingOperation = serde_json::from_str(json).unwrap();
    assert!(op.is_failed());
    assert_eq!(op.retry_count, MAX_RETRIES);
    assert_eq!(op.last_error, None);
}

// ============================================================================
// Retry Policy
// ============================================================================

#[test]
fn retry_count_saturates() {
    let policy = RetryPolicy::default();
    assert_eq!(
        policy.status_after_failure(u32::MAX, FailureKind::Network),
        OperationStatus::Failed
    );
}

#[test]
fn single_attempt_policy() {
    let policy = RetryPolicy::new(1);
    assert_eq!(
        policy.status_after_failure(0, FailureKind::Timeout),
        OperationStatus::Failed
    );
}

#[test]
fn generous_policy_keeps_retrying() {
    let policy = RetryPolicy::new(10);
    for before in 0..9 {
        assert_eq!(
            policy.status_after_failure(before, FailureKind::ServerError(502)),
            OperationStatus::Pending
        );
    }
    assert_eq!(
        policy.status_after_failure(9, FailureKind::ServerError(502)),
        OperationStatus::Failed
    );
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn zero_max_age_only_accepts_same_instant() {
    let entry = CacheEntry::new(DashboardReport::PorStatus.key(), json!({}), 10);
    assert!(entry.is_fresh(10, 0));
    assert!(!entry.is_fresh(11, 0));
}

#[test]
fn huge_max_age_never_goes_stale() {
    let entry = CacheEntry::new("X", json!({}), 0);
    assert!(entry.is_fresh(u64::MAX, u64::MAX));
    assert_eq!(
        DataSource::from_entry(&entry, u64::MAX, u64::MAX),
        DataSource::Cache {
            cached_at: 0,
            stale: false
        }
    );
}

#[test]
fn report_keys_and_paths_are_distinct() {
    let keys: std::collections::HashSet<_> =
        DashboardReport::ALL.iter().map(|r| r.key()).collect();
    let paths: std::collections::HashSet<_> =
        DashboardReport::ALL.iter().map(|r| r.path()).collect();
    assert_eq!(keys.len(), DashboardReport::ALL.len());
    assert_eq!(paths.len(), DashboardReport::ALL.len());
}
