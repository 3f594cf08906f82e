//! Text → vector backends.
//!
//! The classifier treats the embedding function as a black box behind
//! [`Embedder`]. Outputs are normalized by the caller before use.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::vector::normalized;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        if out.len() != 1 {
            return Err(EmbedError::CountMismatch { expected: 1, got: out.len() });
        }
        Ok(out.remove(0))
    }
}

/// Deterministic on-device embedder: hashed word and character-trigram features.
///
/// Tokens made only of digits are ignored, so reference numbers do not pull
/// otherwise identical descriptions apart. It captures spelling, not meaning:
/// with this backend categories come from learned corrections only.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut idx = [0u8; 8];
        idx.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(idx) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[slot] += sign * weight;
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();
        let words = lower
            .split(|c: char| !c.is_alphanumeric() && c != '&' && c != '\'')
            .filter(|w| !w.is_empty())
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()));

        for word in words {
            self.add_feature(&mut v, &format!("w:{word}"), 1.0);
            let padded: Vec<char> = format!("^{word}$").chars().collect();
            for tri in padded.windows(3) {
                let tri: String = tri.iter().collect();
                self.add_feature(&mut v, &format!("t:{tri}"), 0.5);
            }
        }
        normalized(v)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// OpenAI-compatible `/embeddings` endpoint (llama.cpp, Ollama, LM Studio, ...).
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            client,
            url: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Item>,
        }

        #[derive(Deserialize)]
        struct Item {
            index: usize,
            embedding: Vec<f32>,
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut req = self.client.post(&self.url).json(&Req { model: &self.model, input: texts });
        if let Some(key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let mut out: Resp = resp.json().await?;
        if out.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch { expected: texts.len(), got: out.data.len() });
        }
        out.data.sort_by_key(|item| item.index);
        Ok(out.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use tracing::info;

    use super::{EmbedError, Embedder};

    /// AllMiniLM-L6-v2 through fastembed, run on the calling thread.
    pub struct FastEmbedder {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedder {
        pub fn new(models_dir: Option<PathBuf>) -> Result<Self, EmbedError> {
            let mut options = InitOptions::new(EmbeddingModel::AllMiniLML6V2);
            if let Some(dir) = models_dir {
                options = options.with_cache_dir(dir);
            }
            info!("loading AllMiniLM-L6-v2 embedding model");
            let model = TextEmbedding::try_new(options).map_err(|e| EmbedError::Unavailable(e.to_string()))?;
            Ok(Self { model: Mutex::new(model) })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn name(&self) -> &str {
            "all-minilm-l6-v2"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            #[allow(unused_mut)]
            let mut model = self
                .model
                .lock()
                .map_err(|_| EmbedError::Unavailable("model lock poisoned".to_string()))?;
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| EmbedError::Unavailable(e.to_string()))
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::FastEmbedder;

/// Build the configured backend.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    match config.backend {
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(config.dims))),
        EmbeddingBackend::Http => Ok(Arc::new(HttpEmbedder::new(config)?)),
        #[cfg(feature = "onnx")]
        EmbeddingBackend::Onnx => Ok(Arc::new(FastEmbedder::new(config.models_dir.clone())?)),
        #[cfg(not(feature = "onnx"))]
        EmbeddingBackend::Onnx => Err(EmbedError::Unavailable(
            "built without the `onnx` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine;

    #[test]
    fn test_hash_embedder_is_deterministic_and_unit_length() {
        let e = HashEmbedder::default();
        let a = e.embed_text("NTUC FAIRPRICE TAMPINES");
        let b = e.embed_text("NTUC FAIRPRICE TAMPINES");
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_reference_numbers_are_ignored() {
        let e = HashEmbedder::default();
        let a = e.embed_text("GRAB* RIDE 12345");
        let b = e.embed_text("GRAB* RIDE 67890");
        assert!(cosine(&a, &b) > 0.99);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let e = HashEmbedder::default();
        let a = e.embed_text("GRAB* RIDE");
        let b = e.embed_text("NETFLIX.COM SINGAPORE");
        assert!(cosine(&a, &b) < 0.5);
    }

    #[tokio::test]
    async fn test_embed_single_through_batch() {
        let e = HashEmbedder::new(32);
        let v = e.embed("PayNow Transfer").await.unwrap();
        assert_eq!(v.len(), 32);
    }

    #[test]
    fn test_default_backend_is_pretrained() {
        assert_eq!(EmbeddingConfig::default().backend, EmbeddingBackend::Onnx);
        let hash = EmbeddingConfig { backend: EmbeddingBackend::Hash, dims: 64, ..Default::default() };
        assert_eq!(build_embedder(&hash).unwrap().name(), "hash");
    }

    #[test]
    fn test_onnx_without_feature() {
        let config = EmbeddingConfig { backend: EmbeddingBackend::Onnx, ..Default::default() };
        if cfg!(not(feature = "onnx")) {
            assert!(matches!(build_embedder(&config), Err(EmbedError::Unavailable(_))));
        }
    }
}
