//! In-process store implementing all three store traits
//!
//! Holds source documents, migrated events and dimension rows in memory and
//! can inject load failures. Integration tests drive the whole pipeline
//! through it.

use crate::adapters::database::traits::{DimensionStore, EventStore, SourcePage, SourceStore};
use crate::domain::{
    Dimension, DimensionAttributes, MigrateError, Result, SourceDocument, ThreatEvent,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// A stored dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow {
    pub id: Uuid,
    pub key: String,
    pub description: Option<String>,
}

#[derive(Default)]
struct Faults {
    copy_failure: Option<String>,
    load_failure: Option<String>,
    load_failures_remaining: usize,
}

/// In-memory source and destination
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<SourceDocument>>,
    estimated_count: Mutex<Option<Option<u64>>>,
    events: Mutex<Vec<ThreatEvent>>,
    dimensions: Mutex<HashMap<Dimension, Vec<DimensionRow>>>,
    faults: Mutex<Faults>,
    copy_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    dimension_inserts: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose source holds `documents`
    pub fn with_documents(documents: Vec<SourceDocument>) -> Self {
        let store = Self::default();
        *lock(&store.documents) = documents;
        store
    }

    /// Overrides the estimated count; `None` makes the estimate unavailable
    pub fn set_estimated_count(&self, estimate: Option<u64>) {
        *lock(&self.estimated_count) = Some(estimate);
    }

    /// Every COPY attempt fails with `message`
    pub fn fail_copy_with(&self, message: impl Into<String>) {
        lock(&self.faults).copy_failure = Some(message.into());
    }

    /// The next `times` load attempts (COPY or row path) fail with `message`
    pub fn fail_loads(&self, times: usize, message: impl Into<String>) {
        let mut faults = lock(&self.faults);
        faults.load_failure = Some(message.into());
        faults.load_failures_remaining = times;
    }

    /// Snapshot of migrated events
    pub fn events(&self) -> Vec<ThreatEvent> {
        lock(&self.events).clone()
    }

    /// Snapshot of one dimension table
    pub fn dimension_rows(&self, dimension: Dimension) -> Vec<DimensionRow> {
        lock(&self.dimensions)
            .get(&dimension)
            .cloned()
            .unwrap_or_default()
    }

    /// Seeds a dimension row as if it existed before the run
    pub fn seed_dimension(&self, dimension: Dimension, key: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.dimensions)
            .entry(dimension)
            .or_default()
            .push(DimensionRow {
                id,
                key: key.to_string(),
                description: None,
            });
        id
    }

    pub fn copy_calls(&self) -> usize {
        self.copy_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of successful dimension inserts
    pub fn dimension_inserts(&self) -> usize {
        self.dimension_inserts.load(Ordering::SeqCst)
    }

    fn take_load_failure(&self) -> Option<MigrateError> {
        let mut faults = lock(&self.faults);
        if faults.load_failures_remaining == 0 {
            return None;
        }
        faults.load_failures_remaining -= 1;
        faults
            .load_failure
            .clone()
            .map(MigrateError::Database)
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn estimated_count(&self) -> Result<u64> {
        let documents = lock(&self.documents).len() as u64;
        match *lock(&self.estimated_count) {
            None => Ok(documents),
            Some(Some(estimate)) => Ok(estimate),
            Some(None) => Err(MigrateError::Source(
                "estimated count unavailable".to_string(),
            )),
        }
    }

    async fn exact_count(&self) -> Result<u64> {
        Ok(lock(&self.documents).len() as u64)
    }

    async fn read_batch(&self, batch_size: usize, offset: u64) -> Result<SourcePage> {
        let documents = lock(&self.documents);
        let start = (offset as usize).min(documents.len());
        let end = start.saturating_add(batch_size).min(documents.len());
        let slice = documents[start..end].to_vec();
        Ok(SourcePage {
            scanned: slice.len(),
            documents: slice,
            undecodable: Vec::new(),
        })
    }

    fn describe(&self) -> String {
        "memory://source".to_string()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn count_events(&self) -> Result<u64> {
        Ok(lock(&self.events).len() as u64)
    }

    async fn copy_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = lock(&self.faults).copy_failure.clone() {
            return Err(MigrateError::Database(message));
        }
        if let Some(err) = self.take_load_failure() {
            return Err(err);
        }
        lock(&self.events).extend_from_slice(events);
        Ok(events.len() as u64)
    }

    async fn insert_events(&self, events: &[ThreatEvent]) -> Result<u64> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_load_failure() {
            return Err(err);
        }
        lock(&self.events).extend_from_slice(events);
        Ok(events.len() as u64)
    }

    fn describe(&self) -> String {
        "memory://destination".to_string()
    }
}

#[async_trait]
impl DimensionStore for MemoryStore {
    async fn load_keys(&self, dimension: Dimension, limit: i64) -> Result<Vec<(String, Uuid)>> {
        Ok(lock(&self.dimensions)
            .get(&dimension)
            .map(|rows| {
                rows.iter()
                    .take(limit.max(0) as usize)
                    .map(|row| (row.key.clone(), row.id))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_key(&self, dimension: Dimension, key: &str) -> Result<Option<Uuid>> {
        Ok(lock(&self.dimensions)
            .get(&dimension)
            .and_then(|rows| rows.iter().find(|row| row.key == key))
            .map(|row| row.id))
    }

    async fn insert_key(
        &self,
        dimension: Dimension,
        key: &str,
        attributes: &DimensionAttributes,
    ) -> Result<Option<Uuid>> {
        // Give concurrent resolvers a chance to interleave with this insert.
        tokio::task::yield_now().await;

        let mut dimensions = lock(&self.dimensions);
        let rows = dimensions.entry(dimension).or_default();
        if rows.iter().any(|row| row.key == key) {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        rows.push(DimensionRow {
            id,
            key: key.to_string(),
            description: attributes.description.clone(),
        });
        self.dimension_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(Some(id))
    }
}
