//! Migration run summary

use crate::core::dimension::ResolverStats;
use crate::core::migrate::error_log::format_breakdown;
use crate::domain::ErrorKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Every document read was migrated
    Completed,
    /// The run finished but some documents were rejected or lost
    CompletedWithErrors,
    /// The source could not be read; the run stopped early
    Failed,
    /// Shutdown was requested before the source was exhausted
    Interrupted,
}

impl RunStatus {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::CompletedWithErrors => 1,
            RunStatus::Failed => 5,
            RunStatus::Interrupted => 130,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithErrors => "completed_with_errors",
            RunStatus::Failed => "failed",
            RunStatus::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// Totals for one migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    /// Destination row count the run resumed from
    pub start_offset: u64,

    /// Source size estimate used for progress
    pub estimated_total: u64,

    /// Documents read from the source, decoded or not
    pub documents_read: u64,

    /// Rows committed (or counted, in dry-run mode)
    pub processed: u64,

    /// Documents that were not migrated
    pub failed: u64,

    pub batches_committed: u64,
    pub batches_failed: u64,

    /// Batch attempts beyond the first
    pub retries: u64,

    pub copy_batches: u64,
    pub row_batches: u64,

    /// Batches whose COPY failed and were loaded row by row
    pub copy_fallbacks: u64,

    pub duration: Duration,

    /// Failed documents per error class
    pub error_counts: BTreeMap<ErrorKind, u64>,

    pub resolver: ResolverStats,

    pub status: RunStatus,

    pub dry_run: bool,

    /// Fatal error that ended the run early
    pub failure: Option<String>,
}

impl MigrationSummary {
    /// An empty summary resuming at `start_offset`
    pub fn new(start_offset: u64, estimated_total: u64, dry_run: bool) -> Self {
        Self {
            start_offset,
            estimated_total,
            documents_read: 0,
            processed: 0,
            failed: 0,
            batches_committed: 0,
            batches_failed: 0,
            retries: 0,
            copy_batches: 0,
            row_batches: 0,
            copy_fallbacks: 0,
            duration: Duration::ZERO,
            error_counts: BTreeMap::new(),
            resolver: ResolverStats::default(),
            status: RunStatus::Completed,
            dry_run,
            failure: None,
        }
    }

    /// Committed rows per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }

    pub fn is_successful(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            status = %self.status,
            dry_run = self.dry_run,
            start_offset = self.start_offset,
            estimated_total = self.estimated_total,
            documents_read = self.documents_read,
            processed = self.processed,
            failed = self.failed,
            batches_committed = self.batches_committed,
            batches_failed = self.batches_failed,
            retries = self.retries,
            duration_secs = self.duration.as_secs(),
            rows_per_second = format!("{:.1}", self.throughput()),
            "Migration finished"
        );

        tracing::info!(
            copy_batches = self.copy_batches,
            row_batches = self.row_batches,
            copy_fallbacks = self.copy_fallbacks,
            cache_hits = self.resolver.hits,
            cache_misses = self.resolver.misses,
            dimensions_created = self.resolver.created,
            "Load statistics"
        );

        if self.failed > 0 {
            tracing::warn!(
                failed = self.failed,
                errors = %format_breakdown(&self.error_counts),
                "Documents not migrated"
            );
        }

        if let Some(failure) = &self.failure {
            tracing::error!(error = %failure, "Migration stopped early");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_summary() {
        let summary = MigrationSummary::new(500, 1_000, false);
        assert_eq!(summary.start_offset, 500);
        assert_eq!(summary.processed, 0);
        assert!(summary.is_successful());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.throughput(), 0.0);
    }

    #[test]
    fn test_throughput() {
        let mut summary = MigrationSummary::new(0, 1_000, false);
        summary.processed = 1_000;
        summary.duration = Duration::from_secs(4);
        assert_eq!(summary.throughput(), 250.0);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Completed.exit_code(), 0);
        assert_eq!(RunStatus::CompletedWithErrors.exit_code(), 1);
        assert_eq!(RunStatus::Failed.exit_code(), 5);
        assert_eq!(RunStatus::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::CompletedWithErrors.to_string(), "completed_with_errors");
        assert_eq!(RunStatus::Interrupted.to_string(), "interrupted");
    }
}
