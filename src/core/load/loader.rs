//! Dual-path bulk loader
//!
//! Large batches go through `COPY ... FROM STDIN`; small batches, and any
//! batch whose COPY failed, go through a prepared-insert transaction.

use crate::adapters::database::traits::EventStore;
use crate::config::CopyConfig;
use crate::core::load::threshold::AdaptiveThreshold;
use crate::domain::{Result, ThreatEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Which write path committed a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadPath {
    Copy,
    Rows,
    DryRun,
}

/// Result of loading one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub path: LoadPath,
    pub rows: u64,
    /// COPY was attempted and failed before the row path succeeded
    pub copy_fallback: bool,
}

/// Writes batches of threat events to the destination
pub struct BulkLoader {
    store: Arc<dyn EventStore>,
    threshold: AdaptiveThreshold,
    copy_enabled: bool,
    target_rows_per_second: u64,
    dry_run: bool,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn EventStore>, config: &CopyConfig, dry_run: bool) -> Self {
        Self {
            store,
            threshold: AdaptiveThreshold::new(
                config.threshold,
                config.min_threshold,
                config.max_threshold,
                config.adaptive,
            ),
            copy_enabled: config.enabled,
            target_rows_per_second: config.target_rows_per_second,
            dry_run,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold.current()
    }

    /// Persists `events`
    ///
    /// # Errors
    ///
    /// Returns the row-path error when it fails. A COPY failure alone is
    /// never returned; the batch is retried on the row path first.
    pub async fn insert_batch(&self, events: &[ThreatEvent]) -> Result<LoadOutcome> {
        if self.dry_run {
            return Ok(LoadOutcome {
                path: LoadPath::DryRun,
                rows: events.len() as u64,
                copy_fallback: false,
            });
        }
        if events.is_empty() {
            return Ok(LoadOutcome {
                path: LoadPath::Rows,
                rows: 0,
                copy_fallback: false,
            });
        }

        let threshold = self.threshold.observe(events.len());
        let mut copy_fallback = false;

        if self.copy_enabled && events.len() >= threshold {
            let started = Instant::now();
            match self.store.copy_events(events).await {
                Ok(rows) => {
                    self.check_throughput(rows, started);
                    return Ok(LoadOutcome {
                        path: LoadPath::Copy,
                        rows,
                        copy_fallback: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        rows = events.len(),
                        error = %e,
                        "COPY failed, falling back to row inserts"
                    );
                    copy_fallback = true;
                }
            }
        }

        let rows = self.store.insert_events(events).await?;
        Ok(LoadOutcome {
            path: LoadPath::Rows,
            rows,
            copy_fallback,
        })
    }

    fn check_throughput(&self, rows: u64, started: Instant) {
        let elapsed = started.elapsed().as_secs_f64();
        if self.target_rows_per_second == 0 || elapsed <= 0.0 {
            return;
        }
        let rate = rows as f64 / elapsed;
        if rate < self.target_rows_per_second as f64 {
            tracing::warn!(
                rows,
                rows_per_second = rate as u64,
                target = self.target_rows_per_second,
                "COPY throughput below target"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn events(n: usize) -> Vec<ThreatEvent> {
        (0..n)
            .map(|i| ThreatEvent {
                id: Uuid::new_v4(),
                timestamp: Utc::now(),
                asn_registry_id: Uuid::new_v4(),
                source_address: format!("10.0.{}.{}", i / 256, i % 256 + 1).parse().unwrap(),
                source_country_id: None,
                destination_address: None,
                destination_country_id: None,
                source_port: None,
                destination_port: None,
                protocol_id: None,
                category: "bot".to_string(),
                malware_family_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    fn copy_config(threshold: usize) -> CopyConfig {
        CopyConfig {
            threshold,
            min_threshold: 1,
            adaptive: false,
            target_rows_per_second: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_path_selection_by_threshold() {
        let store = Arc::new(MemoryStore::new());
        let loader = BulkLoader::new(store.clone(), &copy_config(10), false);

        let small = loader.insert_batch(&events(9)).await.unwrap();
        assert_eq!(small.path, LoadPath::Rows);

        let large = loader.insert_batch(&events(10)).await.unwrap();
        assert_eq!(large.path, LoadPath::Copy);

        assert_eq!(store.copy_calls(), 1);
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(store.events().len(), 19);
    }

    #[tokio::test]
    async fn test_copy_failure_falls_back_without_loss() {
        let store = Arc::new(MemoryStore::new());
        store.fail_copy_with("COPY rejected: invalid byte sequence");
        let loader = BulkLoader::new(store.clone(), &copy_config(5), false);

        let outcome = loader.insert_batch(&events(20)).await.unwrap();

        assert_eq!(outcome.path, LoadPath::Rows);
        assert!(outcome.copy_fallback);
        assert_eq!(outcome.rows, 20);
        assert_eq!(store.events().len(), 20);
    }

    #[tokio::test]
    async fn test_copy_disabled_uses_rows() {
        let store = Arc::new(MemoryStore::new());
        let config = CopyConfig {
            enabled: false,
            ..copy_config(1)
        };
        let loader = BulkLoader::new(store.clone(), &config, false);

        let outcome = loader.insert_batch(&events(50)).await.unwrap();
        assert_eq!(outcome.path, LoadPath::Rows);
        assert_eq!(store.copy_calls(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let loader = BulkLoader::new(store.clone(), &copy_config(1), true);

        let outcome = loader.insert_batch(&events(7)).await.unwrap();

        assert_eq!(outcome.path, LoadPath::DryRun);
        assert_eq!(outcome.rows, 7);
        assert!(store.events().is_empty());
        assert_eq!(store.copy_calls() + store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_row_path_error_is_returned() {
        let store = Arc::new(MemoryStore::new());
        store.fail_loads(1, "deadlock detected");
        let loader = BulkLoader::new(store.clone(), &copy_config(100), false);

        let err = loader.insert_batch(&events(3)).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
