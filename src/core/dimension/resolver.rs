//! Cached get-or-create of dimension rows
//!
//! This module provides the DimensionResolver, which maps natural keys
//! (`AS138062`, `ID`, `TCP`, ...) to surrogate identifiers in the
//! destination and creates missing rows on first sight.

use crate::adapters::database::traits::DimensionStore;
use crate::domain::{Dimension, DimensionAttributes, MigrateError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

type Cache = HashMap<Dimension, HashMap<String, Uuid>>;

/// Cache counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that went to the store
    pub misses: u64,
    /// Rows this resolver inserted
    pub created: u64,
    /// Inserts lost to a concurrent writer and re-selected
    pub conflicts: u64,
}

/// Dimension resolver shared by all workers
///
/// Each dimension has its own key-to-identifier map. Maps only grow; the
/// lock is released before any store call.
pub struct DimensionResolver {
    store: Arc<dyn DimensionStore>,
    cache: RwLock<Cache>,
    read_only: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    created: AtomicU64,
    conflicts: AtomicU64,
}

impl DimensionResolver {
    pub fn new(store: Arc<dyn DimensionStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Cache::new()),
            read_only: false,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            created: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    /// A resolver that never writes dimension rows
    ///
    /// Unknown keys get a placeholder identifier that lives only in the
    /// cache. Used by dry runs.
    pub fn read_only(store: Arc<dyn DimensionStore>) -> Self {
        Self {
            read_only: true,
            ..Self::new(store)
        }
    }

    /// Fills every cache from the existing dimension tables
    ///
    /// A dimension whose preload fails is logged and left empty; misses on
    /// it fall through to the store. Returns the number of keys loaded.
    pub async fn preload(&self) -> usize {
        let mut loaded = 0;

        for dimension in Dimension::ALL {
            match self
                .store
                .load_keys(dimension, dimension.preload_limit())
                .await
            {
                Ok(rows) => {
                    let count = rows.len();
                    let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
                    cache.entry(dimension).or_default().extend(rows);
                    loaded += count;
                    tracing::info!(dimension = %dimension, keys = count, "Preloaded dimension cache");
                }
                Err(e) => {
                    tracing::warn!(
                        dimension = %dimension,
                        error = %e,
                        "Failed to preload dimension cache, continuing with an empty cache"
                    );
                }
            }
        }

        loaded
    }

    /// Returns the identifier for `key`, creating the row if it does not exist
    ///
    /// Safe to call concurrently for the same key: the losing insert
    /// re-selects the winner's row.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Transformation`] for an empty key, otherwise
    /// whatever the store reports.
    pub async fn get_or_create(
        &self,
        dimension: Dimension,
        key: &str,
        attributes: &DimensionAttributes,
    ) -> Result<Uuid> {
        let key = key.trim();
        if key.is_empty() {
            return Err(MigrateError::Transformation(format!(
                "{dimension} key cannot be empty"
            )));
        }

        if let Some(id) = self.lookup(dimension, key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        if self.read_only {
            return self.resolve_without_insert(dimension, key).await;
        }

        if let Some(id) = self.store.insert_key(dimension, key, attributes).await? {
            self.created.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(dimension = %dimension, key = %key, id = %id, "Created dimension row");
            return Ok(self.remember(dimension, key, id));
        }

        self.conflicts.fetch_add(1, Ordering::Relaxed);
        let id = self.store.find_key(dimension, key).await?.ok_or_else(|| {
            MigrateError::Database(format!(
                "{dimension} '{key}' conflicted on insert but could not be selected"
            ))
        })?;
        Ok(self.remember(dimension, key, id))
    }

    async fn resolve_without_insert(&self, dimension: Dimension, key: &str) -> Result<Uuid> {
        if let Some(id) = self.store.find_key(dimension, key).await? {
            return Ok(self.remember(dimension, key, id));
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(dimension = %dimension, key = %key, "Dry run: dimension row not created");
        Ok(self.remember(dimension, key, Uuid::new_v4()))
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }

    /// Number of cached keys for `dimension`
    pub fn cached(&self, dimension: Dimension) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dimension)
            .map_or(0, HashMap::len)
    }

    fn lookup(&self, dimension: Dimension, key: &str) -> Option<Uuid> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dimension)
            .and_then(|keys| keys.get(key))
            .copied()
    }

    /// Caches `id` for `key` unless another task cached one first; returns the cached id
    fn remember(&self, dimension: Dimension, key: &str, id: Uuid) -> Uuid {
        *self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(dimension)
            .or_default()
            .entry(key.to_string())
            .or_insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    #[tokio::test]
    async fn test_get_or_create_caches() {
        let store = Arc::new(MemoryStore::new());
        let resolver = DimensionResolver::new(store.clone());
        let attrs = DimensionAttributes::described("PT Example Network");

        let first = resolver
            .get_or_create(Dimension::Asn, "AS138062", &attrs)
            .await
            .unwrap();
        let second = resolver
            .get_or_create(Dimension::Asn, "AS138062", &attrs)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.dimension_inserts(), 1);
        assert_eq!(
            resolver.stats(),
            ResolverStats {
                hits: 1,
                misses: 1,
                created: 1,
                conflicts: 0
            }
        );
    }

    #[tokio::test]
    async fn test_preload_then_hit() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.seed_dimension(Dimension::Country, "ID");
        let resolver = DimensionResolver::new(store.clone());

        assert_eq!(resolver.preload().await, 1);
        assert_eq!(resolver.cached(Dimension::Country), 1);

        let id = resolver
            .get_or_create(Dimension::Country, "ID", &DimensionAttributes::default())
            .await
            .unwrap();
        assert_eq!(id, existing);
        assert_eq!(store.dimension_inserts(), 0);
        assert_eq!(resolver.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_conflict_reselects_existing_row() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.seed_dimension(Dimension::Protocol, "TCP");
        let resolver = DimensionResolver::new(store.clone());

        let id = resolver
            .get_or_create(Dimension::Protocol, "TCP", &DimensionAttributes::default())
            .await
            .unwrap();

        assert_eq!(id, existing);
        assert_eq!(resolver.stats().conflicts, 1);
        assert_eq!(store.dimension_rows(Dimension::Protocol).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let resolver = DimensionResolver::new(Arc::new(MemoryStore::new()));
        let result = resolver
            .get_or_create(Dimension::MalwareFamily, "  ", &DimensionAttributes::default())
            .await;
        assert!(matches!(result, Err(MigrateError::Transformation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creation_yields_one_row() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(DimensionResolver::new(store.clone()));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    resolver
                        .get_or_create(Dimension::Asn, "AS64512", &DimensionAttributes::default())
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.dimension_rows(Dimension::Asn).len(), 1);
    }

    #[tokio::test]
    async fn test_read_only_never_inserts() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.seed_dimension(Dimension::Country, "ID");
        let resolver = DimensionResolver::read_only(store.clone());

        let id = resolver
            .get_or_create(Dimension::Country, "ID", &DimensionAttributes::default())
            .await
            .unwrap();
        assert_eq!(id, existing);

        let first = resolver
            .get_or_create(Dimension::Protocol, "TCP", &DimensionAttributes::default())
            .await
            .unwrap();
        let second = resolver
            .get_or_create(Dimension::Protocol, "TCP", &DimensionAttributes::default())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.dimension_inserts(), 0);
        assert!(store.dimension_rows(Dimension::Protocol).is_empty());
    }
}
