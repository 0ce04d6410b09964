//! Classified error accounting
//!
//! Every [`MigrationError`] is logged once, with its identifier, class,
//! message and retryability, and counted per class.

use crate::domain::{ErrorKind, MigrationError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Per-class error counters shared across the run
#[derive(Debug, Default)]
pub struct ErrorLog {
    total: AtomicU64,
    by_kind: Mutex<BTreeMap<ErrorKind, u64>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: &MigrationError) {
        match error.kind {
            ErrorKind::Validation | ErrorKind::Transformation => tracing::warn!(
                document_id = %error.document_id,
                error_type = %error.kind,
                retryable = error.retryable,
                message = %error.message,
                "Document rejected"
            ),
            _ => tracing::error!(
                document_id = %error.document_id,
                error_type = %error.kind,
                retryable = error.retryable,
                message = %error.message,
                "Document not migrated"
            ),
        }

        self.total.fetch_add(1, Ordering::Relaxed);
        *self
            .by_kind
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(error.kind)
            .or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn count(&self, kind: ErrorKind) -> u64 {
        self.by_kind
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// Counts for every class, zeros included, in reporting order
    pub fn breakdown(&self) -> BTreeMap<ErrorKind, u64> {
        let by_kind = self.by_kind.lock().unwrap_or_else(PoisonError::into_inner);
        ErrorKind::ALL
            .iter()
            .map(|kind| (*kind, by_kind.get(kind).copied().unwrap_or(0)))
            .collect()
    }
}

/// Renders a breakdown as `VALIDATION_ERROR=3 DATABASE_ERROR=1`, skipping zeros
pub fn format_breakdown(breakdown: &BTreeMap<ErrorKind, u64>) -> String {
    let parts: Vec<String> = breakdown
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}
