use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use penny_classify::{KvStore, MemoryStore, SqliteStore, StorageConfig};
use tracing::{debug, warn};

pub fn penny_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("PENNY_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".penny"))
}

pub fn ensure_penny_home() -> Result<PathBuf> {
    let dir = penny_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// SQLite file backing the embedding cache and corrections.
pub fn cache_path(storage: &StorageConfig) -> Result<PathBuf> {
    match &storage.path {
        Some(p) => Ok(p.clone()),
        None => Ok(ensure_penny_home()?.join("cache.sqlite3")),
    }
}

/// Open the durable store. Any failure degrades to an in-memory store for
/// this session.
pub fn open_store(storage: &StorageConfig) -> Box<dyn KvStore> {
    if storage.in_memory {
        return Box::new(MemoryStore::new());
    }
    let path = match cache_path(storage) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "no cache location; corrections will not persist");
            return Box::new(MemoryStore::new());
        }
    };
    match SqliteStore::open(&path) {
        Ok(store) => {
            debug!(path = %path.display(), "cache store opened");
            Box::new(store)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache store unavailable; corrections will not persist");
            Box::new(MemoryStore::new())
        }
    }
}
