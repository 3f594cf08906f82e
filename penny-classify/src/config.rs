use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Scoring settings for the embedding classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Best score needed to accept a category; anything lower is "Other".
    pub confidence_threshold: f32,
    /// Added to the similarity of every learned correction vector.
    pub correction_boost: f32,
    /// Transactions per batch in the bulk pass.
    pub batch_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            correction_boost: 0.25,
            batch_size: 32,
        }
    }
}

/// Settings for finding transactions similar to a corrected one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub similarity_threshold: f32,
    /// Below this share of cached vectors, missing ones are computed first.
    pub min_cached_ratio: f32,
    pub batch_size: usize,
    /// A batch that runs longer than this halves the next batch.
    pub batch_budget_ms: u64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_cached_ratio: 0.5,
            batch_size: 16,
            batch_budget_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// fastembed AllMiniLM-L6-v2, run on device (the `onnx` feature).
    #[default]
    Onnx,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
    /// Feature hashing. Not semantic: exemplar scores stay below the
    /// threshold, so only learned corrections and their near-duplicates
    /// are recognized. For offline use and tests.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Output size of the hash embedder.
    pub dims: usize,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key, if the endpoint needs one.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Model download directory for the ONNX backend.
    pub models_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dims: 256,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key_env: None,
            timeout_secs: 30,
            models_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; `<home>/cache.sqlite3` when unset.
    pub path: Option<PathBuf>,
    /// Keep everything in memory for this session.
    pub in_memory: bool,
}
