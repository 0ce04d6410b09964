//! Integration tests for graceful shutdown
//!
//! These tests verify that:
//! - A shutdown request stops the run with an interrupted status
//! - Batches committed before the request stay committed
//! - A later run resumes from the destination count without duplicates

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use threat_migrate::adapters::database::EventStore;
use threat_migrate::adapters::memory::MemoryStore;
use threat_migrate::config::{CopyConfig, MigrationConfig};
use threat_migrate::core::migrate::{MigrationCoordinator, RunStatus};
use threat_migrate::domain::{ErrorKind, Result, SourceDocument, ThreatEvent};
use tokio::sync::watch;

fn documents(n: usize) -> Vec<SourceDocument> {
    let base = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| SourceDocument {
            id: format!("{:024x}", i + 1),
            timestamp: Some(base + chrono::Duration::seconds(i as i64)),
            asn: "AS13335".to_string(),
            category: "scanner".to_string(),
            source_address: format!("192.0.2.{}", i % 250 + 1),
            ..Default::default()
        })
        .collect()
}

fn config(retry_delay_seconds: u64) -> MigrationConfig {
    MigrationConfig {
        batch_size: 10,
        worker_count: 1,
        queue_depth: 1,
        max_retries: 3,
        retry_delay_seconds,
        copy: CopyConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Destination that requests shutdown right after its Nth row insert commits
struct StopAfterInserts {
    inner: Arc<MemoryStore>,
    stop_after: usize,
    inserts: AtomicUsize,
    shutdown: watch::Sender<bool>,
}

#[async_trait]
impl EventStore for StopAfterInserts {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.inner.ensure_schema().await
    }

    async fn count_events(&self) -> Result<u64> {
        self.inner.count_events().await
    }

    async fn copy_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        self.inner.copy_events(events).await
    }

    async fn insert_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        let rows = self.inner.insert_events(events).await?;
        if self.inserts.fetch_add(1, Ordering::SeqCst) + 1 == self.stop_after {
            let _ = self.shutdown.send(true);
        }
        Ok(rows)
    }

    fn describe(&self) -> String {
        "stop-after-inserts".to_string()
    }
}

#[tokio::test]
async fn test_shutdown_keeps_committed_batches_and_resumes() {
    let store = Arc::new(MemoryStore::with_documents(documents(100)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gated = Arc::new(StopAfterInserts {
        inner: store.clone(),
        stop_after: 3,
        inserts: AtomicUsize::new(0),
        shutdown: shutdown_tx,
    });

    let interrupted = MigrationCoordinator::new(
        config(0),
        false,
        store.clone(),
        gated,
        store.clone(),
        shutdown_rx,
    )
    .execute()
    .await
    .unwrap();

    assert_eq!(interrupted.status, RunStatus::Interrupted);
    assert_eq!(interrupted.exit_code(), 130);
    assert_eq!(interrupted.processed, 30);
    assert_eq!(interrupted.batches_committed, 3);
    assert_eq!(interrupted.failed, 0);
    assert_eq!(store.events().len(), 30);

    let (_tx, rx) = watch::channel(false);
    let resumed = MigrationCoordinator::new(
        config(0),
        false,
        store.clone(),
        store.clone(),
        store.clone(),
        rx,
    )
    .execute()
    .await
    .unwrap();

    assert_eq!(resumed.status, RunStatus::Completed);
    assert_eq!(resumed.start_offset, 30);
    assert_eq!(resumed.processed, 70);

    let mut timestamps: Vec<_> = store.events().iter().map(|e| e.timestamp).collect();
    timestamps.sort();
    timestamps.dedup();
    assert_eq!(timestamps.len(), 100);
}

#[tokio::test]
async fn test_shutdown_interrupts_retry_backoff() {
    let store = Arc::new(MemoryStore::with_documents(documents(40)));
    store.fail_loads(1, "connection reset by peer");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // A one-hour backoff only ends early through shutdown
    let coordinator = MigrationCoordinator::new(
        config(3_600),
        false,
        store.clone(),
        store.clone(),
        store.clone(),
        shutdown_rx,
    );
    let run = tokio::spawn(async move { coordinator.execute().await });

    tokio::time::timeout(Duration::from_secs(10), async {
        while store.insert_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    shutdown_tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(summary.batches_committed, 0);
    assert_eq!(summary.batches_failed, 1);
    assert_eq!(summary.retries, 1);
    assert_eq!(summary.error_counts[&ErrorKind::Database], 10);
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn test_shutdown_before_start_reads_nothing() {
    let store = Arc::new(MemoryStore::with_documents(documents(20)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let summary = MigrationCoordinator::new(
        config(0),
        false,
        store.clone(),
        store.clone(),
        store.clone(),
        shutdown_rx,
    )
    .execute()
    .await
    .unwrap();

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(summary.processed, 0);
    assert!(store.events().is_empty());
}
