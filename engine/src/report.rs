//! Outcome accounting for a drain pass.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Result of one drain pass: operations delivered vs. attempts that failed.
///
/// A pass that did nothing (already running, offline, empty queue) reports
/// zero for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn new(synced: usize, failed: usize) -> Self {
        Self { synced, failed }
    }

    pub fn record_synced(&mut self) {
        self.synced += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    /// Number of operations the pass attempted.
    pub fn attempted(&self) -> usize {
        self.synced + self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.synced += other.synced;
        self.failed += other.failed;
    }
}
