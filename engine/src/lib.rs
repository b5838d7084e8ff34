//! # Beneficios Engine
//!
//! Offline-first rules for the benefits dashboard PWA.
//!
//! This crate holds the pieces of the offline synchronization layer that do
//! not need IO: the shape of queued writes and cached reports, the lifecycle of
//! a queued write, the retry policy, and the bookkeeping of a drain pass. The
//! storage, network and scheduling live in `beneficios-agent`.
//!
//! ## Design Principles
//!
//! - **No IO**: no files, network, clocks or randomness; callers pass `now` and ids
//! - **Deterministic**: same inputs, same outputs
//! - **Opaque payloads**: request bodies and report data are `serde_json::Value`
//!
//! ## Core Concepts
//!
//! ### Pending operations
//!
//! A [`PendingOperation`] is a write recorded locally. Its `op_type` selects
//! the API endpoint through the closed [`OperationType`] enum; an unknown type
//! is an [`Error::UnknownOperationType`], never a silent no-op.
//!
//! Status moves `pending -> syncing -> (removed | pending | failed)`, checked
//! by [`OperationStatus::transition_to`].
//!
//! ### Retry policy
//!
//! [`RetryPolicy`] decides whether a failed attempt goes back to `pending` or
//! becomes `failed`. With the default of [`MAX_RETRIES`] attempts:
//!
//! ```rust
//! use beneficios_engine::{FailureKind, OperationStatus, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.status_after_failure(0, FailureKind::Network), OperationStatus::Pending);
//! assert_eq!(policy.status_after_failure(2, FailureKind::Network), OperationStatus::Failed);
//! ```
//!
//! ### Dashboard cache
//!
//! A [`CacheEntry`] stores one report payload per key. Freshness is judged by
//! the reader with [`CacheEntry::is_fresh`]; reads are tagged with a
//! [`DataSource`].

pub mod cache;
pub mod error;
pub mod operation;
pub mod policy;
pub mod report;
pub mod sync_log;

// Re-export main types at crate root
pub use cache::{CacheEntry, DashboardReport, DataSource};
pub use error::Error;
pub use operation::{
    resolve_endpoint, OperationStatus, OperationType, PendingOperation, MAX_RETRIES,
};
pub use policy::{FailureKind, RetryPolicy};
pub use report::SyncReport;
pub use sync_log::{SyncAction, SyncLogEntry};

/// Type aliases for clarity
pub type OperationId = String;
pub type CacheKey = String;
/// Milliseconds since the Unix epoch
pub type Timestamp = u64;
