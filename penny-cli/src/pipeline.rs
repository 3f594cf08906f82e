use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use penny_classify::{EmbeddingCache, EmbeddingClassifier, build_embedder};
use penny_core::Statement;
use penny_ingest::{ParserRegistry, extract_many};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::open_store;

/// Extract every file concurrently, then parse each in input order.
pub async fn load_statements(cfg: &Config, files: Vec<PathBuf>) -> Result<Vec<(PathBuf, Statement)>> {
    if files.is_empty() {
        bail!("no statement files given");
    }
    let registry = ParserRegistry::with_defaults(&cfg.parser).context("build parser registry")?;

    let mut out = Vec::with_capacity(files.len());
    for (path, pages) in extract_many(files, cfg.layout.clone()).await {
        let pages = pages?;
        let statement = registry
            .parse_document(&pages)
            .with_context(|| format!("parse {}", path.display()))?;
        info!(
            file = %path.display(),
            statement = %statement.id,
            transactions = statement.transactions.len(),
            "statement parsed"
        );
        out.push((path, statement));
    }
    Ok(out)
}

pub async fn load_statement(cfg: &Config, file: PathBuf) -> Result<Statement> {
    let mut all = load_statements(cfg, vec![file]).await?;
    match all.pop() {
        Some((_, statement)) => Ok(statement),
        None => bail!("no statement parsed"),
    }
}

/// Open the cache and bring up the classifier. A backend that cannot be built
/// leaves the classifier not ready; callers keep rule categories.
pub async fn open_classifier(cfg: &Config) -> EmbeddingClassifier {
    let cache = EmbeddingCache::load(open_store(&cfg.storage));
    let mut classifier = match build_embedder(&cfg.embedding) {
        Ok(embedder) => EmbeddingClassifier::new(embedder, cache, cfg.classifier.clone()),
        Err(e) => {
            warn!(error = %e, "embedding backend could not be built; using rules only");
            EmbeddingClassifier::unavailable(cache, cfg.classifier.clone())
        }
    };
    classifier.init().await;
    classifier
}
