//! Property tests for the retry invariant: an operation never holds more than
//! `max_retries` failed attempts unless it is `failed`.

use beneficios_engine::{FailureKind, OperationStatus, RetryPolicy};
use proptest::prelude::*;

fn failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Network),
        Just(FailureKind::Timeout),
        (500u16..600).prop_map(FailureKind::ServerError),
        (400u16..500).prop_map(FailureKind::ClientError),
    ]
}

proptest! {
    #[test]
    fn retry_count_bounded_while_not_failed(
        max_retries in 1u32..8,
        permanent in any::<bool>(),
        failures in prop::collection::vec(failure_kind(), 1..20),
    ) {
        let policy = RetryPolicy::new(max_retries).with_permanent_client_errors(permanent);
        let mut retry_count = 0u32;
        let mut status = OperationStatus::Pending;

        for kind in failures {
            if status == OperationStatus::Failed {
                break;
            }
            status = policy.status_after_failure(retry_count, kind);
            retry_count += 1;

            if status != OperationStatus::Failed {
                prop_assert!(retry_count < max_retries);
            }
            prop_assert!(retry_count <= max_retries);
        }
    }

    #[test]
    fn transient_failures_take_exactly_max_attempts(max_retries in 1u32..8) {
        let policy = RetryPolicy::new(max_retries);
        let mut attempts = 0u32;
        loop {
            let status = policy.status_after_failure(attempts, FailureKind::Network);
            attempts += 1;
            if status == OperationStatus::Failed {
                break;
            }
        }
        prop_assert_eq!(attempts, max_retries);
    }
}
