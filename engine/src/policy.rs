//! Retry policy for failed deliveries.

use crate::operation::{OperationStatus, MAX_RETRIES};
use serde::{Deserialize, Serialize};

/// Why a delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "camelCase")]
pub enum FailureKind {
    /// Connection refused, DNS failure, reset...
    Network,
    /// No response within the request timeout
    Timeout,
    /// 5xx (and other non-4xx, non-2xx) responses
    ServerError(u16),
    /// 4xx responses
    ClientError(u16),
    /// The operation type has no endpoint
    UnknownType,
}

impl FailureKind {
    /// Classify a non-success HTTP status code.
    pub fn from_status(status: u16) -> Self {
        if (400..500).contains(&status) {
            FailureKind::ClientError(status)
        } else {
            FailureKind::ServerError(status)
        }
    }

    /// Failures worth retrying right away from the write path.
    ///
    /// Request timeout (408) and rate limiting (429) are 4xx but transient.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Network | FailureKind::Timeout | FailureKind::ServerError(_) => true,
            FailureKind::ClientError(status) => matches!(status, 408 | 429),
            FailureKind::UnknownType => false,
        }
    }
}

/// Decides what happens to an operation after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Failed attempts allowed before the operation becomes `failed`
    pub max_retries: u32,
    /// Treat 4xx rejections as terminal on the first attempt
    pub client_errors_are_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            client_errors_are_permanent: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            ..Self::default()
        }
    }

    pub fn with_permanent_client_errors(mut self, permanent: bool) -> Self {
        self.client_errors_are_permanent = permanent;
        self
    }

    /// Whether a failure of this kind ends the operation regardless of attempts.
    pub fn is_permanent(&self, kind: FailureKind) -> bool {
        match kind {
            FailureKind::UnknownType => true,
            FailureKind::ClientError(_) => self.client_errors_are_permanent && !kind.is_transient(),
            _ => false,
        }
    }

    /// Status an operation moves to after a failed attempt.
    ///
    /// `retry_count` is the value before this attempt; the attempt itself
    /// counts, so the third consecutive failure (with the default maximum)
    /// yields `Failed`.
    pub fn status_after_failure(&self, retry_count: u32, kind: FailureKind) -> OperationStatus {
        if self.is_permanent(kind) {
            return OperationStatus::Failed;
        }

        let attempts = retry_count.saturating_add(1);
        if attempts >= self.max_retries {
            OperationStatus::Failed
        } else {
            OperationStatus::Pending
        }
    }
}
