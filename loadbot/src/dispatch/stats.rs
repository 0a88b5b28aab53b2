//! Atomic counters for a run

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free transfer counters shared by every worker of a run
#[derive(Debug, Default)]
pub struct RunStats {
    /// Transfers accepted by a connection
    submitted: AtomicU64,
    /// Submitted transfers confirmed included
    included: AtomicU64,
    /// Submissions that failed (each one ends the run)
    failed: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_included(&self) {
        self.included.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn included(&self) -> u64 {
        self.included.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
