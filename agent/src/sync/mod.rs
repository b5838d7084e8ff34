//! Sync manager and its automatic triggers.

mod auto;
mod manager;

pub use auto::{AutoSync, AutoSyncSettings};
pub use manager::{DrainSettings, LastSync, PassGuard, SyncManager, SyncState};
