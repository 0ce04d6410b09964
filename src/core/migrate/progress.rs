//! Run progress accounting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared progress counters, updated by the result aggregator
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    processed: AtomicU64,
    errored: AtomicU64,
    batches_committed: AtomicU64,
    batches_failed: AtomicU64,
    started: Instant,
}

/// Point-in-time view of a [`ProgressTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub processed: u64,
    pub errored: u64,
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub elapsed: Duration,
}

impl ProgressTracker {
    /// Starts the clock; `total` is the number of documents expected this run
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            batches_committed: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Adds the outcome of one batch
    pub fn record_batch(&self, processed: u64, errored: u64, committed: bool) {
        self.processed.fetch_add(processed, Ordering::Relaxed);
        self.errored.fetch_add(errored, Ordering::Relaxed);
        if committed {
            self.batches_committed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.batches_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            processed: self.processed.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

impl ProgressSnapshot {
    /// Documents handled so far, committed or errored
    pub fn handled(&self) -> u64 {
        self.processed + self.errored
    }

    /// Completion percentage against the estimate; may exceed 100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.handled() as f64 / self.total as f64 * 100.0
    }

    /// Committed rows per second
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }

    /// Time left at the current handling rate, if one can be estimated
    pub fn eta(&self) -> Option<Duration> {
        let secs = self.elapsed.as_secs_f64();
        let handled = self.handled();
        if secs <= 0.0 || handled == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(handled);
        Some(Duration::from_secs_f64(remaining as f64 / (handled as f64 / secs)))
    }
}
