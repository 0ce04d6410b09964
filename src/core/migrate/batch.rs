//! Batch processing with retry
//!
//! One batch moves through `Received -> Transforming -> Loading` and ends
//! `Committed` or `Failed`, passing through `Retrying` between attempts.
//! A retry re-runs the whole batch; per-document errors from an abandoned
//! attempt are discarded so each document is counted once.

use crate::config::MigrationConfig;
use crate::core::load::{BulkLoader, LoadOutcome, LoadPath};
use crate::core::shutdown;
use crate::core::source::SourceBatch;
use crate::core::transform::Transformer;
use crate::domain::{MigrateError, MigrationError, Result};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Lifecycle of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Received,
    Transforming,
    Loading,
    Committed,
    Retrying,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Received => "received",
            BatchState::Transforming => "transforming",
            BatchState::Loading => "loading",
            BatchState::Committed => "committed",
            BatchState::Retrying => "retrying",
            BatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final outcome of one batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_id: u64,
    /// `Committed` or `Failed`
    pub state: BatchState,
    /// Documents read from the source for this batch
    pub documents: usize,
    /// Rows committed (or counted, in dry-run mode)
    pub loaded: u64,
    /// One entry per document that did not make it
    pub errors: Vec<MigrationError>,
    pub retries: usize,
    pub path: Option<LoadPath>,
    pub copy_fallback: bool,
    pub duration: Duration,
}

impl BatchResult {
    pub fn is_committed(&self) -> bool {
        self.state == BatchState::Committed
    }
}

/// Runs transform and load for batches, with retry and backoff
pub struct BatchProcessor {
    transformer: Transformer,
    loader: Arc<BulkLoader>,
    max_retries: usize,
    retry_delay: Duration,
    batch_timeout: Duration,
}

impl BatchProcessor {
    pub fn new(transformer: Transformer, loader: Arc<BulkLoader>, config: &MigrationConfig) -> Self {
        Self {
            transformer,
            loader,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            batch_timeout: config.batch_timeout(),
        }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn loader(&self) -> &Arc<BulkLoader> {
        &self.loader
    }

    /// Processes one batch to completion
    ///
    /// Never returns an error: a batch that cannot be committed is reported
    /// as `Failed` with every document recorded as a database error.
    /// Shutdown interrupts only the backoff sleep, never a running attempt.
    pub async fn process(
        &self,
        batch: SourceBatch,
        shutdown: &mut watch::Receiver<bool>,
    ) -> BatchResult {
        let started = Instant::now();
        let mut retry = 0usize;
        tracing::debug!(
            batch_id = batch.id,
            offset = batch.offset,
            size = batch.len(),
            state = %BatchState::Received,
            "Batch received"
        );

        loop {
            let error = match tokio::time::timeout(self.batch_timeout, self.attempt(&batch)).await
            {
                Ok(Ok((outcome, errors))) => {
                    return self.committed(&batch, outcome, errors, retry, started);
                }
                Ok(Err(e)) => e,
                Err(_) => MigrateError::Timeout(format!(
                    "batch {} exceeded {}s",
                    batch.id,
                    self.batch_timeout.as_secs()
                )),
            };

            if !error.is_retryable() || retry >= self.max_retries {
                return self.failed(&batch, &error, retry, started);
            }

            let delay = self.retry_delay * (retry as u32 + 1);
            retry += 1;
            tracing::debug!(batch_id = batch.id, state = %BatchState::Retrying, "Batch attempt failed");
            crate::log_retry_attempt!(batch.id, retry, self.max_retries, delay, error);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown::requested(shutdown) => {
                    let cancelled = MigrateError::Cancelled(format!(
                        "shutdown during backoff after: {error}"
                    ));
                    return self.failed(&batch, &cancelled, retry, started);
                }
            }
        }
    }

    /// One full pass over the batch: transform every document, then load
    async fn attempt(&self, batch: &SourceBatch) -> Result<(LoadOutcome, Vec<MigrationError>)> {
        let now = Utc::now();
        let mut errors: Vec<MigrationError> = batch
            .undecodable
            .iter()
            .map(|id| MigrationError::validation(id.clone(), "document could not be decoded"))
            .collect();
        let mut events = Vec::with_capacity(batch.documents.len());

        tracing::trace!(batch_id = batch.id, state = %BatchState::Transforming, "Batch state");
        for document in &batch.documents {
            match self.transformer.transform(document, now).await {
                Ok(event) => events.push(event),
                Err(e @ (MigrateError::Validation(_) | MigrateError::Transformation(_))) => {
                    errors.push(MigrationError::from_error(document.log_id(), &e));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::trace!(
            batch_id = batch.id,
            state = %BatchState::Loading,
            rows = events.len(),
            "Batch state"
        );
        let outcome = self.loader.insert_batch(&events).await?;
        Ok((outcome, errors))
    }

    fn committed(
        &self,
        batch: &SourceBatch,
        outcome: LoadOutcome,
        errors: Vec<MigrationError>,
        retries: usize,
        started: Instant,
    ) -> BatchResult {
        let result = BatchResult {
            batch_id: batch.id,
            state: BatchState::Committed,
            documents: batch.len(),
            loaded: outcome.rows,
            errors,
            retries,
            path: Some(outcome.path),
            copy_fallback: outcome.copy_fallback,
            duration: started.elapsed(),
        };
        crate::log_batch_result!(
            result.batch_id,
            result.state,
            result.loaded,
            result.errors.len(),
            result.duration
        );
        result
    }

    fn failed(
        &self,
        batch: &SourceBatch,
        error: &MigrateError,
        retries: usize,
        started: Instant,
    ) -> BatchResult {
        tracing::error!(
            batch_id = batch.id,
            offset = batch.offset,
            retries,
            error = %error,
            "Batch failed, documents will not be migrated"
        );

        let message = format!("batch {} failed after {} retries: {}", batch.id, retries, error);
        let retryable = error.is_retryable();
        let errors = batch
            .documents
            .iter()
            .map(|document| {
                MigrationError::database(document.log_id(), message.clone())
                    .with_retryable(retryable)
            })
            .chain(batch.undecodable.iter().map(|id| {
                MigrationError::validation(id.clone(), "document could not be decoded")
            }))
            .collect();

        let result = BatchResult {
            batch_id: batch.id,
            state: BatchState::Failed,
            documents: batch.len(),
            loaded: 0,
            errors,
            retries,
            path: None,
            copy_fallback: false,
            duration: started.elapsed(),
        };
        crate::log_batch_result!(
            result.batch_id,
            result.state,
            result.loaded,
            result.errors.len(),
            result.duration
        );
        result
    }
}
