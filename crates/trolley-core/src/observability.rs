//! Consumer counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of `ConsumerStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerCounts {
    pub merged: u64,
    pub malformed: u64,
    pub failed: u64,
    pub conflicts: u64,
}

impl ConsumerCounts {
    /// Messages the consumer is done with, whatever the outcome.
    pub fn handled(&self) -> u64 {
        self.merged + self.malformed + self.failed
    }
}

#[derive(Debug, Default)]
pub struct ConsumerStats {
    merged: AtomicU64,
    malformed: AtomicU64,
    failed: AtomicU64,
    conflicts: AtomicU64,
}

impl ConsumerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_merged(&self) {
        self.merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflicts(&self, n: u32) {
        self.conflicts.fetch_add(u64::from(n), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConsumerCounts {
        ConsumerCounts {
            merged: self.merged.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }
}
