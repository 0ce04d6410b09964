//! Store abstraction traits
//!
//! The migration engine talks to its two stores only through these traits:
//! [`SourceStore`] for the document collection, [`EventStore`] and
//! [`DimensionStore`] for the relational destination.

use crate::domain::{Dimension, DimensionAttributes, Result, SourceDocument, ThreatEvent};
use async_trait::async_trait;
use uuid::Uuid;

/// One offset/limit read from the source
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    /// Decoded documents, in source order
    pub documents: Vec<SourceDocument>,

    /// Raw documents consumed, decoded or not; the next offset advances by this
    pub scanned: usize,

    /// Identifiers (or positions) of documents that could not be decoded
    pub undecodable: Vec<String>,
}

impl SourcePage {
    pub fn is_empty(&self) -> bool {
        self.scanned == 0
    }
}

/// Read side: an ordered document collection
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Checks that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Fast, approximate document count
    async fn estimated_count(&self) -> Result<u64>;

    /// Exact document count
    async fn exact_count(&self) -> Result<u64>;

    /// Reads up to `batch_size` documents starting at `offset`, ordered by
    /// the source's stable identifier order
    ///
    /// # Errors
    ///
    /// Returns an error if the query or cursor iteration fails. Individual
    /// undecodable documents are reported in [`SourcePage::undecodable`].
    async fn read_batch(&self, batch_size: usize, offset: u64) -> Result<SourcePage>;

    /// Printable location, credentials redacted
    fn describe(&self) -> String;
}

/// Write side: the `"ThreatEvents"` fact table
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Checks that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Creates missing tables and indexes
    async fn ensure_schema(&self) -> Result<()>;

    /// Exact number of rows already migrated
    async fn count_events(&self) -> Result<u64>;

    /// Streams all events through the bulk-load protocol in one transaction
    ///
    /// # Errors
    ///
    /// Any failure rolls back the whole batch.
    async fn copy_events(&self, events: &[ThreatEvent]) -> Result<u64>;

    /// Inserts all events with one prepared statement per row, committing once
    ///
    /// # Errors
    ///
    /// Any failure rolls back the whole batch.
    async fn insert_events(&self, events: &[ThreatEvent]) -> Result<u64>;

    /// Printable location, credentials redacted
    fn describe(&self) -> String;
}

/// Write side: dimension tables with a unique natural key
#[async_trait]
pub trait DimensionStore: Send + Sync {
    /// Loads up to `limit` existing `(natural key, id)` pairs
    async fn load_keys(&self, dimension: Dimension, limit: i64) -> Result<Vec<(String, Uuid)>>;

    /// Selects the id of the row with natural key `key`
    async fn find_key(&self, dimension: Dimension, key: &str) -> Result<Option<Uuid>>;

    /// Inserts a new row unless `key` already exists
    ///
    /// Returns the new id, or `None` when another writer owns the key.
    async fn insert_key(
        &self,
        dimension: Dimension,
        key: &str,
        attributes: &DimensionAttributes,
    ) -> Result<Option<Uuid>>;
}
