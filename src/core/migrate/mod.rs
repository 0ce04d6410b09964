//! Migration orchestration
//!
//! This module runs a whole migration: the [`MigrationCoordinator`] owns the
//! task topology, the [`BatchProcessor`] drives one batch through transform
//! and load with retry, and [`ProgressTracker`] / [`ErrorLog`] hold the
//! shared counters that end up in the [`MigrationSummary`].

pub mod batch;
pub mod coordinator;
pub mod error_log;
pub mod progress;
pub mod summary;

pub use batch::{BatchProcessor, BatchResult, BatchState};
pub use coordinator::{MigrationCoordinator, DEFAULT_FALLBACK_TOTAL};
pub use error_log::{format_breakdown, ErrorLog};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use summary::{MigrationSummary, RunStatus};
