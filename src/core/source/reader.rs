//! Resumable source reader
//!
//! The starting offset is the destination's current row count, so a
//! restarted run skips documents an earlier run already committed. Reads
//! proceed in `_id` order until the source runs dry or the estimated total
//! is reached.

use crate::adapters::database::traits::{EventStore, SourcePage, SourceStore};
use crate::config::MigrationConfig;
use crate::core::shutdown;
use crate::domain::{MigrateError, Result, SourceDocument};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// One unit of work for the worker pool
#[derive(Debug, Clone)]
pub struct SourceBatch {
    /// Sequence number within this run, starting at 1
    pub id: u64,
    /// Source offset of the first document
    pub offset: u64,
    /// Decoded documents, in source order
    pub documents: Vec<SourceDocument>,
    /// Identifiers of documents that could not be decoded
    pub undecodable: Vec<String>,
}

impl SourceBatch {
    /// Documents read from the source, decoded or not
    pub fn len(&self) -> usize {
        self.documents.len() + self.undecodable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a run starts and how much it expects to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPlan {
    pub start_offset: u64,
    pub estimated_total: u64,
    /// The estimate came from configuration because the source could not provide one
    pub estimate_is_fallback: bool,
}

impl ReadPlan {
    /// Documents left to read, per the estimate
    pub fn remaining(&self) -> u64 {
        self.estimated_total.saturating_sub(self.start_offset)
    }
}

/// Why the reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStop {
    /// The source returned an empty batch
    Exhausted,
    /// The offset reached the estimated total
    ReachedEstimate,
    /// Shutdown was requested
    Cancelled,
    /// All workers are gone
    ChannelClosed,
}

/// Reader statistics at exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderReport {
    pub batches: u64,
    pub scanned: u64,
    pub final_offset: u64,
    pub stop: ReaderStop,
}

/// Streams source batches onto the batch queue
pub struct ResumableReader {
    source: Arc<dyn SourceStore>,
    batch_size: usize,
    max_retries: usize,
    retry_delay: Duration,
}

impl ResumableReader {
    pub fn new(source: Arc<dyn SourceStore>, config: &MigrationConfig) -> Self {
        Self {
            source,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }

    /// Computes the resume offset and the expected total
    ///
    /// # Errors
    ///
    /// Fails if the destination row count cannot be read; without it the
    /// resume position is unknown.
    pub async fn plan(&self, events: &dyn EventStore, fallback_total: u64) -> Result<ReadPlan> {
        let start_offset = events.count_events().await?;

        let (estimated_total, estimate_is_fallback) = match self.source.estimated_count().await {
            Ok(count) => (count, false),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback_total,
                    "Source count estimate unavailable, using configured total"
                );
                (fallback_total, true)
            }
        };

        tracing::info!(
            start_offset,
            estimated_total,
            remaining = estimated_total.saturating_sub(start_offset),
            "Resume position computed from destination row count"
        );

        Ok(ReadPlan {
            start_offset,
            estimated_total,
            estimate_is_fallback,
        })
    }

    /// Reads batches until the source is exhausted, the estimate is reached,
    /// or shutdown is requested
    ///
    /// # Errors
    ///
    /// Returns the read error once retries are exhausted or when it is not
    /// retryable.
    pub async fn run(
        &self,
        plan: ReadPlan,
        tx: mpsc::Sender<SourceBatch>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ReaderReport> {
        let mut offset = plan.start_offset;
        let mut batches = 0u64;
        let mut scanned = 0u64;

        let report = |batches, scanned, offset, stop| ReaderReport {
            batches,
            scanned,
            final_offset: offset,
            stop,
        };

        loop {
            if shutdown::is_requested(&shutdown) {
                tracing::info!(offset, "Reader stopping on shutdown request");
                return Ok(report(batches, scanned, offset, ReaderStop::Cancelled));
            }
            if offset >= plan.estimated_total {
                tracing::info!(offset, estimated_total = plan.estimated_total, "Reader reached estimated total");
                return Ok(report(batches, scanned, offset, ReaderStop::ReachedEstimate));
            }

            let page = match self.read_with_retry(offset, &mut shutdown).await {
                Ok(page) => page,
                Err(MigrateError::Cancelled(_)) => {
                    return Ok(report(batches, scanned, offset, ReaderStop::Cancelled));
                }
                Err(e) => return Err(e),
            };

            if page.is_empty() {
                tracing::info!(offset, "Source exhausted");
                return Ok(report(batches, scanned, offset, ReaderStop::Exhausted));
            }

            batches += 1;
            scanned += page.scanned as u64;
            let batch = SourceBatch {
                id: batches,
                offset,
                documents: page.documents,
                undecodable: page.undecodable,
            };
            offset += page.scanned as u64;

            tracing::debug!(batch_id = batch.id, offset = batch.offset, size = batch.len(), "Queueing batch");

            tokio::select! {
                sent = tx.send(batch) => {
                    if sent.is_err() {
                        tracing::warn!("Batch queue closed, reader stopping");
                        return Ok(report(batches, scanned, offset, ReaderStop::ChannelClosed));
                    }
                }
                _ = shutdown::requested(&mut shutdown) => {
                    tracing::info!(offset, "Reader stopping on shutdown request");
                    return Ok(report(batches, scanned, offset, ReaderStop::Cancelled));
                }
            }
        }
    }

    async fn read_with_retry(
        &self,
        offset: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SourcePage> {
        let mut retry = 0usize;
        loop {
            match self.source.read_batch(self.batch_size, offset).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.retry_delay * (retry as u32 + 1);
                    crate::log_retry_attempt!(
                        format!("read@{offset}"),
                        retry + 1,
                        self.max_retries,
                        delay,
                        e
                    );
                    retry += 1;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown::requested(shutdown) => {
                            return Err(MigrateError::Cancelled(format!(
                                "source read at offset {offset}"
                            )));
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(offset, error = %e, "Source read failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    fn documents(n: usize) -> Vec<SourceDocument> {
        (0..n)
            .map(|i| SourceDocument {
                id: format!("{i:024x}"),
                ..Default::default()
            })
            .collect()
    }

    fn config(batch_size: usize) -> MigrationConfig {
        MigrationConfig {
            batch_size,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_plan_uses_destination_count() {
        let store = Arc::new(MemoryStore::with_documents(documents(10)));
        let reader = ResumableReader::new(store.clone(), &config(4));

        let plan = reader.plan(store.as_ref(), 99).await.unwrap();
        assert_eq!(plan.start_offset, 0);
        assert_eq!(plan.estimated_total, 10);
        assert!(!plan.estimate_is_fallback);
    }

    #[tokio::test]
    async fn test_plan_falls_back_to_configured_total() {
        let store = Arc::new(MemoryStore::with_documents(documents(10)));
        store.set_estimated_count(None);
        let reader = ResumableReader::new(store.clone(), &config(4));

        let plan = reader.plan(store.as_ref(), 99).await.unwrap();
        assert_eq!(plan.estimated_total, 99);
        assert!(plan.estimate_is_fallback);
    }

    #[tokio::test]
    async fn test_run_reads_all_batches_in_order() {
        let store = Arc::new(MemoryStore::with_documents(documents(10)));
        let reader = ResumableReader::new(store.clone(), &config(4));
        let plan = ReadPlan {
            start_offset: 0,
            estimated_total: 100,
            estimate_is_fallback: false,
        };
        let (tx, mut rx) = mpsc::channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let report = reader.run(plan, tx, shutdown_rx).await.unwrap();
        assert_eq!(report.stop, ReaderStop::Exhausted);
        assert_eq!(report.scanned, 10);

        let mut offsets = Vec::new();
        while let Some(batch) = rx.recv().await {
            offsets.push((batch.id, batch.offset, batch.len()));
        }
        assert_eq!(offsets, vec![(1, 0, 4), (2, 4, 4), (3, 8, 2)]);
    }

    #[tokio::test]
    async fn test_run_stops_at_estimate() {
        let store = Arc::new(MemoryStore::with_documents(documents(10)));
        let reader = ResumableReader::new(store.clone(), &config(4));
        let plan = ReadPlan {
            start_offset: 2,
            estimated_total: 6,
            estimate_is_fallback: false,
        };
        let (tx, mut rx) = mpsc::channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let report = reader.run(plan, tx, shutdown_rx).await.unwrap();
        assert_eq!(report.stop, ReaderStop::ReachedEstimate);
        assert_eq!(report.final_offset, 6);
        assert_eq!(rx.recv().await.map(|b| b.offset), Some(2));
    }

    #[tokio::test]
    async fn test_run_cancelled_while_queue_full() {
        let store = Arc::new(MemoryStore::with_documents(documents(100)));
        let reader = ResumableReader::new(store.clone(), &config(1));
        let plan = ReadPlan {
            start_offset: 0,
            estimated_total: 100,
            estimate_is_fallback: false,
        };
        let (tx, _rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { reader.run(plan, tx, shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(report.stop, ReaderStop::Cancelled);
        assert_eq!(report.batches, 2);
    }
}
