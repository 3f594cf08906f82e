//! Embedding cache and correction store: in-memory maps backed by a
//! [`KvStore`] through the [`PersistQueue`].

use std::collections::HashMap;

use tracing::{info, warn};

use penny_core::Category;

use crate::persist::PersistQueue;
use crate::store::{CacheKey, Corrections, KvStore, MemoryStore};

pub struct EmbeddingCache {
    vectors: HashMap<CacheKey, Vec<f32>>,
    corrections: Corrections,
    persist: PersistQueue,
}

impl EmbeddingCache {
    /// Load everything the store holds, then hand the store to the writer.
    ///
    /// Unreadable state is logged and treated as empty.
    pub fn load(store: Box<dyn KvStore>) -> Self {
        let corrections = store.load_corrections().unwrap_or_else(|e| {
            warn!(error = %e, "could not load corrections; starting empty");
            Corrections::new()
        });
        let vectors: HashMap<_, _> = store
            .load_vectors()
            .unwrap_or_else(|e| {
                warn!(error = %e, "could not load embedding cache; starting empty");
                Vec::new()
            })
            .into_iter()
            .collect();
        info!(corrections = corrections.len(), vectors = vectors.len(), "embedding cache loaded");

        Self {
            vectors,
            corrections,
            persist: PersistQueue::spawn(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    pub fn get(&self, key: &CacheKey) -> Option<&[f32]> {
        self.vectors.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.vectors.contains_key(key)
    }

    /// Cache a vector and queue it for persistence.
    pub fn insert(&mut self, key: CacheKey, vector: Vec<f32>) {
        self.persist.put_vector(key.clone(), vector.clone());
        self.vectors.insert(key, vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Exact-description lookup.
    pub fn correction(&self, description: &str) -> Option<Category> {
        self.corrections.get(description).copied()
    }

    pub fn corrections(&self) -> &Corrections {
        &self.corrections
    }

    /// Record a correction; a later one for the same description replaces it.
    /// `vector` is the description's embedding when one could be computed.
    pub fn learn(&mut self, description: &str, category: Category, vector: Option<Vec<f32>>) {
        self.corrections.insert(description.to_string(), category);
        if let Some(v) = vector {
            self.insert(Self::correction_key(description), v);
        }
        self.persist.save_corrections(self.corrections.clone());
    }

    /// Key under which a correction's vector is cached.
    pub fn correction_key(description: &str) -> CacheKey {
        CacheKey::new(description, None)
    }

    /// Corrections that have a cached vector.
    pub fn correction_vectors(&self) -> impl Iterator<Item = (Category, &[f32])> + '_ {
        self.corrections.iter().filter_map(|(desc, cat)| {
            self.get(&Self::correction_key(desc)).map(|v| (*cat, v))
        })
    }

    /// Drop every cached vector and correction, in memory and on disk.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.corrections.clear();
        self.persist.clear();
    }

    pub async fn flush(&self) {
        self.persist.flush().await;
    }

    /// Blocking flush for synchronous callers.
    pub fn flush_blocking(&self) {
        self.persist.flush_blocking();
    }
}
