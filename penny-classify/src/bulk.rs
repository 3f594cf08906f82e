//! Whole-statement classification passes.

use tracing::{debug, info};

use penny_core::{CategorySource, Transaction};

use crate::classifier::EmbeddingClassifier;
use crate::store::CacheKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Transactions the pass looked at.
    pub examined: usize,
    /// Transactions whose category was replaced.
    pub updated: usize,
    /// Hidden or user-categorized transactions left alone.
    pub skipped: usize,
}

fn eligible(txn: &Transaction) -> bool {
    !txn.hidden && txn.category_source != CategorySource::User
}

fn apply(classifier: &EmbeddingClassifier, txn: &mut Transaction) -> bool {
    match classifier.classify_cached(&txn.description, txn.vendor.as_deref()) {
        Some(res) if res.is_accepted() => {
            if txn.category != res.category || txn.category_source != CategorySource::Embedding {
                debug!(id = %txn.id, from = %txn.category, to = %res.category, confidence = res.confidence, "recategorized");
            }
            txn.set_category(res.category, CategorySource::Embedding);
            true
        }
        _ => false,
    }
}

/// Classify every eligible transaction, computing missing vectors batch by
/// batch and yielding to the runtime between batches.
pub async fn classify_all(classifier: &mut EmbeddingClassifier, txns: &mut [Transaction]) -> BulkSummary {
    let mut summary = BulkSummary::default();
    if !classifier.is_ready() {
        debug!("classifier not ready; keeping rule categories");
        return summary;
    }

    let batch_size = classifier.config().batch_size.max(1);
    for batch in txns.chunks_mut(batch_size) {
        let keys: Vec<CacheKey> = batch
            .iter()
            .filter(|t| eligible(t))
            .map(CacheKey::for_transaction)
            .collect();
        classifier.compute_vectors(&keys).await;

        for txn in batch.iter_mut() {
            if !eligible(txn) {
                summary.skipped += 1;
                continue;
            }
            summary.examined += 1;
            if apply(classifier, txn) {
                summary.updated += 1;
            }
        }
        tokio::task::yield_now().await;
    }

    info!(examined = summary.examined, updated = summary.updated, skipped = summary.skipped, "embedding pass finished");
    summary
}

/// Synchronous variant: only transactions whose vectors are already cached
/// (or whose description was corrected) can change.
pub fn classify_all_cached(classifier: &EmbeddingClassifier, txns: &mut [Transaction]) -> BulkSummary {
    let mut summary = BulkSummary::default();
    if !classifier.is_ready() {
        return summary;
    }
    for txn in txns.iter_mut() {
        if !eligible(txn) {
            summary.skipped += 1;
            continue;
        }
        summary.examined += 1;
        if apply(classifier, txn) {
            summary.updated += 1;
        }
    }
    summary
}
