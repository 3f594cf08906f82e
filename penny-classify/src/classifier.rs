//! Embedding classifier service.
//!
//! Scores a transaction text against learned correction vectors (boosted) and
//! per-category exemplars; the best score wins if it clears the threshold.
//! Learned corrections with the exact same description short-circuit at 1.0.

use std::sync::Arc;

use tracing::{debug, info, warn};

use penny_core::Category;

use crate::cache::EmbeddingCache;
use crate::config::ClassifierConfig;
use crate::embedder::Embedder;
use crate::exemplars::build_exemplars;
use crate::store::CacheKey;
use crate::vector::{cosine, normalized};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Ready,
    /// The embedder could not produce vectors; callers use the rule engine.
    NotReady,
    Disposed,
}

/// What produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Literal description found among learned corrections.
    ExactCorrection,
    /// Closest vector was a learned correction.
    Correction,
    Exemplar,
    /// Nothing cleared the threshold; category is Other.
    BelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: Category,
    /// Best score, capped at 1.0. Raw score when below threshold.
    pub confidence: f32,
    pub matched: MatchKind,
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        self.matched != MatchKind::BelowThreshold
    }
}

pub struct EmbeddingClassifier {
    config: ClassifierConfig,
    embedder: Option<Arc<dyn Embedder>>,
    cache: EmbeddingCache,
    exemplars: Vec<(Category, Vec<f32>)>,
    state: ServiceState,
}

impl EmbeddingClassifier {
    pub fn new(embedder: Arc<dyn Embedder>, cache: EmbeddingCache, config: ClassifierConfig) -> Self {
        Self {
            config,
            embedder: Some(embedder),
            cache,
            exemplars: Vec::new(),
            state: ServiceState::Uninitialized,
        }
    }

    /// A classifier with no backend. `init` leaves it not ready, so callers
    /// keep rule categories while corrections still load and persist.
    pub fn unavailable(cache: EmbeddingCache, config: ClassifierConfig) -> Self {
        Self {
            config,
            embedder: None,
            cache,
            exemplars: Vec::new(),
            state: ServiceState::Uninitialized,
        }
    }

    /// Build exemplars and backfill vectors for corrections that lack one.
    /// Safe to call again; a ready service is left as is.
    pub async fn init(&mut self) -> ServiceState {
        if matches!(self.state, ServiceState::Ready | ServiceState::Disposed) {
            return self.state;
        }
        let Some(embedder) = self.embedder.clone() else {
            self.state = ServiceState::NotReady;
            return self.state;
        };

        match build_exemplars(embedder.as_ref()).await {
            Ok(exemplars) => self.exemplars = exemplars,
            Err(e) => {
                warn!(backend = embedder.name(), error = %e, "embedding backend unavailable; using rules only");
                self.state = ServiceState::NotReady;
                return self.state;
            }
        }

        let missing: Vec<CacheKey> = self
            .cache
            .corrections()
            .keys()
            .map(|d| EmbeddingCache::correction_key(d))
            .filter(|k| !self.cache.contains(k))
            .collect();
        if !missing.is_empty() {
            let computed = self.compute_vectors(&missing).await;
            debug!(missing = missing.len(), computed, "backfilled correction vectors");
        }

        self.state = ServiceState::Ready;
        info!(
            backend = embedder.name(),
            exemplars = self.exemplars.len(),
            corrections = self.cache.corrections().len(),
            "embedding classifier ready"
        );
        self.state
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ServiceState::Ready
    }

    /// Release the model and exemplars. The cache stays usable for flushing.
    pub fn dispose(&mut self) {
        self.exemplars.clear();
        self.embedder = None;
        self.state = ServiceState::Disposed;
        debug!("embedding classifier disposed");
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EmbeddingCache {
        &mut self.cache
    }

    /// Fast path: cached vectors only. `None` when not ready or the vector
    /// has not been computed yet.
    pub fn classify_cached(&self, description: &str, vendor: Option<&str>) -> Option<Classification> {
        if !self.is_ready() {
            return None;
        }
        if let Some(hit) = self.exact_match(description) {
            return Some(hit);
        }
        let vector = self.cache.get(&CacheKey::new(description, vendor))?;
        Some(self.score(vector))
    }

    /// Computes the text's vector when it is not cached yet.
    pub async fn classify(&mut self, description: &str, vendor: Option<&str>) -> Option<Classification> {
        if !self.is_ready() {
            return None;
        }
        if let Some(hit) = self.exact_match(description) {
            return Some(hit);
        }
        let key = CacheKey::new(description, vendor);
        let vector = self.vector_for(&key).await?;
        Some(self.score(&vector))
    }

    fn exact_match(&self, description: &str) -> Option<Classification> {
        self.cache.correction(description).map(|category| Classification {
            category,
            confidence: 1.0,
            matched: MatchKind::ExactCorrection,
        })
    }

    /// Best of boosted correction similarities and exemplar similarities.
    pub fn score(&self, vector: &[f32]) -> Classification {
        let mut best: Option<(Category, f32, MatchKind)> = None;
        let boost = self.config.correction_boost;

        let corrections = self
            .cache
            .correction_vectors()
            .map(|(cat, v)| (cat, cosine(vector, v) + boost, MatchKind::Correction));
        let exemplars = self
            .exemplars
            .iter()
            .map(|(cat, v)| (*cat, cosine(vector, v), MatchKind::Exemplar));

        for (cat, score, kind) in corrections.chain(exemplars) {
            if best.is_none_or(|(_, s, _)| score > s) {
                best = Some((cat, score, kind));
            }
        }

        match best {
            Some((category, score, matched)) if score >= self.config.confidence_threshold => Classification {
                category,
                confidence: score.min(1.0),
                matched,
            },
            other => Classification {
                category: Category::Other,
                confidence: other.map(|(_, s, _)| s).unwrap_or(0.0),
                matched: MatchKind::BelowThreshold,
            },
        }
    }

    /// Cached vector for `key`, computing and caching it on a miss.
    pub async fn vector_for(&mut self, key: &CacheKey) -> Option<Vec<f32>> {
        if let Some(v) = self.cache.get(key) {
            return Some(v.to_vec());
        }
        let embedder = self.embedder.clone()?;
        match embedder.embed(&key.text()).await {
            Ok(v) => {
                let v = normalized(v);
                self.cache.insert(key.clone(), v.clone());
                Some(v)
            }
            Err(e) => {
                warn!(error = %e, text = %key.text(), "embedding failed");
                None
            }
        }
    }

    /// Compute and cache vectors for `keys` in one backend call. Returns how
    /// many were added.
    pub async fn compute_vectors(&mut self, keys: &[CacheKey]) -> usize {
        let Some(embedder) = self.embedder.clone() else {
            return 0;
        };
        let keys: Vec<&CacheKey> = keys.iter().filter(|k| !self.cache.contains(k)).collect();
        if keys.is_empty() {
            return 0;
        }
        let texts: Vec<String> = keys.iter().map(|k| k.text()).collect();
        match embedder.embed_batch(&texts).await {
            Ok(vectors) if vectors.len() == keys.len() => {
                for (key, v) in keys.iter().zip(vectors) {
                    self.cache.insert((*key).clone(), normalized(v));
                }
                keys.len()
            }
            Ok(vectors) => {
                warn!(expected = keys.len(), got = vectors.len(), "embedding batch size mismatch");
                0
            }
            Err(e) => {
                warn!(error = %e, batch = keys.len(), "embedding batch failed");
                0
            }
        }
    }

    /// Remember a user's category for this exact description.
    pub async fn learn(&mut self, description: &str, category: Category) {
        let key = EmbeddingCache::correction_key(description);
        let vector = match self.cache.get(&key) {
            Some(v) => Some(v.to_vec()),
            None => match self.embedder.clone() {
                Some(embedder) => match embedder.embed(description).await {
                    Ok(v) => Some(normalized(v)),
                    Err(e) => {
                        warn!(error = %e, "could not embed correction; exact match only");
                        None
                    }
                },
                None => None,
            },
        };
        info!(description, category = %category, "learned correction");
        self.cache.learn(description, category, vector);
    }
}
