//! Error types for the offline engine.

use crate::OperationStatus;
use thiserror::Error;

/// All possible errors from the offline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Resolution errors
    #[error("unknown operation type: {0}")]
    UnknownOperationType(String),

    #[error("unknown dashboard report: {0}")]
    UnknownReport(String),

    // State errors
    #[error("invalid operation status: {0}")]
    InvalidStatus(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OperationStatus,
        to: OperationStatus,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
