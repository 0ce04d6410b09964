//! Migration coordinator - main orchestrator for a migration run
//!
//! Wires the resumable reader, the worker pool, the result aggregator and
//! the progress reporter together over bounded channels:
//!
//! ```text
//! reader -> batch queue -> workers (transform, resolve, load) -> result queue -> aggregator
//! ```
//!
//! Shutdown is a `watch` channel. The reader stops issuing reads, workers
//! stop dequeuing and finish the batch they hold, and the run is reported
//! as interrupted.

use crate::adapters::database::traits::{DimensionStore, EventStore, SourceStore};
use crate::config::MigrationConfig;
use crate::core::dimension::DimensionResolver;
use crate::core::load::{BulkLoader, LoadPath};
use crate::core::migrate::batch::{BatchProcessor, BatchResult};
use crate::core::migrate::error_log::{format_breakdown, ErrorLog};
use crate::core::migrate::progress::ProgressTracker;
use crate::core::migrate::summary::{MigrationSummary, RunStatus};
use crate::core::shutdown;
use crate::core::source::{ReaderReport, ReaderStop, ResumableReader, SourceBatch};
use crate::core::transform::Transformer;
use crate::domain::{MigrateError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinError;

/// Last-known source size used when the source cannot estimate its count
pub const DEFAULT_FALLBACK_TOTAL: u64 = 25_121_993;

/// Per-batch totals gathered by the aggregator
#[derive(Debug, Default)]
struct BatchTally {
    documents: u64,
    retries: u64,
    copy_batches: u64,
    row_batches: u64,
    copy_fallbacks: u64,
}

/// Migration coordinator
pub struct MigrationCoordinator {
    config: MigrationConfig,
    dry_run: bool,
    fallback_total: u64,
    source: Arc<dyn SourceStore>,
    events: Arc<dyn EventStore>,
    dimensions: Arc<dyn DimensionStore>,
    shutdown: watch::Receiver<bool>,
}

impl MigrationCoordinator {
    pub fn new(
        config: MigrationConfig,
        dry_run: bool,
        source: Arc<dyn SourceStore>,
        events: Arc<dyn EventStore>,
        dimensions: Arc<dyn DimensionStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            dry_run,
            fallback_total: DEFAULT_FALLBACK_TOTAL,
            source,
            events,
            dimensions,
            shutdown,
        }
    }

    /// Overrides the total used when the source count estimate fails
    pub fn with_fallback_total(mut self, total: u64) -> Self {
        self.fallback_total = total;
        self
    }

    /// Execute the migration
    ///
    /// This is the main entry point for a run. It:
    /// 1. Computes the resume offset from the destination row count
    /// 2. Preloads the dimension caches
    /// 3. Starts the reader, `worker_count` workers, the aggregator and the
    ///    progress reporter
    /// 4. Waits for all of them and builds the summary
    ///
    /// Batch failures never end the run early; they are counted.
    ///
    /// # Errors
    ///
    /// Fails only when the resume position cannot be determined. A reader
    /// that gives up mid-run produces a summary with [`RunStatus::Failed`].
    pub async fn execute(&self) -> Result<MigrationSummary> {
        let started = Instant::now();
        tracing::info!(
            batch_size = self.config.batch_size,
            workers = self.config.worker_count,
            queue_depth = self.config.queue_depth,
            dry_run = self.dry_run,
            "Starting migration"
        );

        let reader = ResumableReader::new(self.source.clone(), &self.config);
        let plan = reader
            .plan(self.events.as_ref(), self.fallback_total)
            .await?;
        let mut summary =
            MigrationSummary::new(plan.start_offset, plan.estimated_total, self.dry_run);

        let resolver = Arc::new(if self.dry_run {
            DimensionResolver::read_only(self.dimensions.clone())
        } else {
            DimensionResolver::new(self.dimensions.clone())
        });
        let preloaded = resolver.preload().await;
        tracing::info!(keys = preloaded, "Dimension caches preloaded");

        let loader = Arc::new(BulkLoader::new(
            self.events.clone(),
            &self.config.copy,
            self.dry_run,
        ));
        let processor = Arc::new(BatchProcessor::new(
            Transformer::new(resolver.clone()),
            loader,
            &self.config,
        ));
        let progress = Arc::new(ProgressTracker::new(plan.remaining()));
        let error_log = Arc::new(ErrorLog::new());

        let (batch_tx, batch_rx) = mpsc::channel::<SourceBatch>(self.config.queue_depth);
        let (result_tx, result_rx) = mpsc::channel::<BatchResult>(self.config.worker_count);

        let reader_handle = {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { reader.run(plan, batch_tx, shutdown).await })
        };

        let batch_rx = Arc::new(Mutex::new(batch_rx));
        let mut workers = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            workers.push(tokio::spawn(run_worker(
                worker_id,
                batch_rx.clone(),
                processor.clone(),
                result_tx.clone(),
                self.shutdown.clone(),
            )));
        }
        drop(result_tx);

        let aggregator = tokio::spawn(aggregate(result_rx, progress.clone(), error_log.clone()));

        let (stop_tx, stop_rx) = oneshot::channel();
        let reporter = tokio::spawn(report_progress(
            progress.clone(),
            error_log.clone(),
            self.config.progress_interval(),
            stop_rx,
            self.shutdown.clone(),
        ));

        let reader_result = reader_handle.await.map_err(join_error).and_then(|r| r);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
        let tally = aggregator.await.map_err(join_error)?;
        let _ = stop_tx.send(());
        if let Err(e) = reporter.await {
            tracing::warn!(error = %e, "Progress reporter task panicked");
        }

        let snapshot = progress.snapshot();
        summary.documents_read = tally.documents;
        summary.processed = snapshot.processed;
        summary.failed = snapshot.errored;
        summary.batches_committed = snapshot.batches_committed;
        summary.batches_failed = snapshot.batches_failed;
        summary.retries = tally.retries;
        summary.copy_batches = tally.copy_batches;
        summary.row_batches = tally.row_batches;
        summary.copy_fallbacks = tally.copy_fallbacks;
        summary.error_counts = error_log.breakdown();
        summary.resolver = resolver.stats();
        summary.duration = started.elapsed();

        summary.status = match &reader_result {
            Err(e) => {
                summary.failure = Some(e.to_string());
                RunStatus::Failed
            }
            Ok(report) => {
                log_abandoned(report, tally.documents);
                if report.stop == ReaderStop::Cancelled || shutdown::is_requested(&self.shutdown)
                {
                    RunStatus::Interrupted
                } else if summary.failed > 0 {
                    RunStatus::CompletedWithErrors
                } else {
                    RunStatus::Completed
                }
            }
        };

        summary.log_summary();
        Ok(summary)
    }
}

/// Dequeues and processes batches until the queue closes or shutdown
async fn run_worker(
    worker_id: usize,
    batches: Arc<Mutex<mpsc::Receiver<SourceBatch>>>,
    processor: Arc<BatchProcessor>,
    results: mpsc::Sender<BatchResult>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "Worker started");
    loop {
        if shutdown::is_requested(&shutdown) {
            break;
        }
        let next = tokio::select! {
            batch = async { batches.lock().await.recv().await } => batch,
            _ = shutdown::requested(&mut shutdown) => None,
        };
        let Some(batch) = next else {
            break;
        };

        let result = processor.process(batch, &mut shutdown).await;
        if results.send(result).await.is_err() {
            tracing::warn!(worker_id, "Result queue closed");
            break;
        }
    }
    tracing::debug!(worker_id, "Worker stopped");
}

/// Feeds batch results into the progress tracker and error log
async fn aggregate(
    mut results: mpsc::Receiver<BatchResult>,
    progress: Arc<ProgressTracker>,
    error_log: Arc<ErrorLog>,
) -> BatchTally {
    let mut tally = BatchTally::default();
    while let Some(result) = results.recv().await {
        for error in &result.errors {
            error_log.record(error);
        }
        progress.record_batch(
            result.loaded,
            result.errors.len() as u64,
            result.is_committed(),
        );

        tally.documents += result.documents as u64;
        tally.retries += result.retries as u64;
        match result.path {
            Some(LoadPath::Copy) => tally.copy_batches += 1,
            Some(LoadPath::Rows) => tally.row_batches += 1,
            Some(LoadPath::DryRun) | None => {}
        }
        if result.copy_fallback {
            tally.copy_fallbacks += 1;
        }
    }
    tally
}

/// Logs progress every `interval` until stopped or shutdown
async fn report_progress(
    progress: Arc<ProgressTracker>,
    error_log: Arc<ErrorLog>,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = progress.snapshot();
                tracing::info!(
                    processed = snapshot.processed,
                    errored = snapshot.errored,
                    total = snapshot.total,
                    percent = format!("{:.2}", snapshot.percent()),
                    rows_per_second = format!("{:.1}", snapshot.rows_per_second()),
                    eta_secs = snapshot.eta().map(|eta| eta.as_secs()),
                    errors = %format_breakdown(&error_log.breakdown()),
                    "Migration progress"
                );
            }
            _ = &mut stop => break,
            _ = shutdown::requested(&mut shutdown) => break,
        }
    }
}

fn log_abandoned(report: &ReaderReport, handled: u64) {
    let abandoned = report.scanned.saturating_sub(handled);
    if abandoned > 0 {
        tracing::warn!(
            abandoned,
            final_offset = report.final_offset,
            "Queued documents were not processed; a later run resumes from the destination count"
        );
    }
}

fn join_error(e: JoinError) -> MigrateError {
    MigrateError::Other(format!("task failed: {e}"))
}
