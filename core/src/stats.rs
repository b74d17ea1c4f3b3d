use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Engine-wide counters. Updating them never logs or reports anything.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    created: AtomicU64,
    fulfilled: AtomicU64,
    rejected: AtomicU64,
    unobserved_rejections: AtomicU64,
}

impl Counters {
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fulfilled(&self) {
        self.fulfilled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unobserved_rejection(&self) {
        self.unobserved_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            fulfilled: self.fulfilled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unobserved_rejections: self.unobserved_rejections.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub created: u64,
    pub fulfilled: u64,
    pub rejected: u64,
    /// Promises dropped while rejected without ever having a reaction.
    pub unobserved_rejections: u64,
}

impl StatsSnapshot {
    pub fn pending(&self) -> u64 {
        self.created
            .saturating_sub(self.fulfilled)
            .saturating_sub(self.rejected)
    }
}
