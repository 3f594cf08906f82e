//! Durable key-value storage for learned corrections and cached vectors.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use penny_core::{Category, Transaction};

use crate::vector::{decode_le, encode_le};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed correction payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("create store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Learned corrections: exact description → category.
pub type Corrections = BTreeMap<String, Category>;

/// Cache key for an embedding: the text that was embedded, as its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub description: String,
    pub vendor: Option<String>,
}

impl CacheKey {
    pub fn new(description: impl Into<String>, vendor: Option<&str>) -> Self {
        Self {
            description: description.into(),
            vendor: vendor.map(str::to_string),
        }
    }

    pub fn for_transaction(txn: &Transaction) -> Self {
        Self::new(txn.description.as_str(), txn.vendor.as_deref())
    }

    /// Text handed to the embedder.
    pub fn text(&self) -> String {
        match &self.vendor {
            Some(v) => format!("{} {}", self.description, v),
            None => self.description.clone(),
        }
    }

    /// Hex SHA-256 over the length-prefixed fields.
    pub fn durable_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.description.len() as u64).to_le_bytes());
        hasher.update(self.description.as_bytes());
        match &self.vendor {
            Some(v) => {
                hasher.update([1u8]);
                hasher.update((v.len() as u64).to_le_bytes());
                hasher.update(v.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hex::encode(hasher.finalize())
    }
}

/// Two logical tables: one corrections record, one vector per cache key.
pub trait KvStore: Send {
    fn load_corrections(&self) -> Result<Corrections, StoreError>;
    fn save_corrections(&mut self, corrections: &Corrections) -> Result<(), StoreError>;
    /// Every decodable vector. Broken rows are skipped.
    fn load_vectors(&self) -> Result<Vec<(CacheKey, Vec<f32>)>, StoreError>;
    fn put_vector(&mut self, key: &CacheKey, vector: &[f32]) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS corrections (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS embeddings (
    key TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    vendor TEXT,
    vector BLOB NOT NULL
);
";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl KvStore for SqliteStore {
    fn load_corrections(&self) -> Result<Corrections, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row("SELECT payload FROM corrections WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Ok(Corrections::new()),
        }
    }

    fn save_corrections(&mut self, corrections: &Corrections) -> Result<(), StoreError> {
        let payload = serde_json::to_string(corrections)?;
        self.conn.execute(
            "INSERT INTO corrections (id, payload) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
            params![payload],
        )?;
        Ok(())
    }

    fn load_vectors(&self) -> Result<Vec<(CacheKey, Vec<f32>)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, description, vendor, vector FROM embeddings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (stored_key, description, vendor, blob) = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable embedding row");
                    continue;
                }
            };
            let key = CacheKey { description, vendor };
            if key.durable_key() != stored_key {
                warn!(key = %stored_key, "embedding row key does not match its text, skipping");
                continue;
            }
            match decode_le(&blob) {
                Some(v) => out.push((key, v)),
                None => warn!(key = %stored_key, "malformed embedding vector, skipping"),
            }
        }
        debug!(vectors = out.len(), "loaded cached embeddings");
        Ok(out)
    }

    fn put_vector(&mut self, key: &CacheKey, vector: &[f32]) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO embeddings (key, description, vendor, vector) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET vector = excluded.vector",
            params![key.durable_key(), key.description, key.vendor, encode_le(vector)],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("DELETE FROM corrections; DELETE FROM embeddings;")?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    corrections: Corrections,
    vectors: HashMap<String, (CacheKey, Vec<f32>)>,
}

/// In-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn load_corrections(&self) -> Result<Corrections, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.corrections.clone())
    }

    fn save_corrections(&mut self, corrections: &Corrections) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.corrections = corrections.clone();
        Ok(())
    }

    fn load_vectors(&self) -> Result<Vec<(CacheKey, Vec<f32>)>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut out: Vec<_> = inner.vectors.values().cloned().collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn put_vector(&mut self, key: &CacheKey, vector: &[f32]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.vectors.insert(key.durable_key(), (key.clone(), vector.to_vec()));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.corrections.clear();
        inner.vectors.clear();
        Ok(())
    }
}
