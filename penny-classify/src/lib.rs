//! penny-classify: embedding classifier, vector cache, learned corrections
//! and similarity propagation.

pub mod bulk;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod embedder;
pub mod exemplars;
pub mod persist;
pub mod propagation;
pub mod store;
pub mod vector;

pub use bulk::{classify_all, classify_all_cached, BulkSummary};
pub use cache::EmbeddingCache;
pub use classifier::{Classification, EmbeddingClassifier, MatchKind, ServiceState};
pub use config::{ClassifierConfig, EmbeddingBackend, EmbeddingConfig, PropagationConfig, StorageConfig};
pub use embedder::{build_embedder, EmbedError, Embedder, HashEmbedder, HttpEmbedder};
#[cfg(feature = "onnx")]
pub use embedder::FastEmbedder;
pub use propagation::{apply_bulk_correction, correct_and_propose, find_similar, Candidate};
pub use store::{CacheKey, KvStore, MemoryStore, SqliteStore, StoreError};
