//! Correction propagation: after a user fixes one transaction, find others
//! that look the same and propose the same fix.
//!
//! Nothing here changes a transaction without an explicit call to
//! [`apply_bulk_correction`].

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use penny_core::{Category, CategorySource, Transaction};

use crate::classifier::EmbeddingClassifier;
use crate::config::PropagationConfig;
use crate::store::CacheKey;
use crate::vector::cosine;

/// A transaction proposed for the same correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub index: usize,
    pub similarity: f32,
    pub current: Category,
}

/// Transactions similar to `txns[target]` that do not already carry `category`.
///
/// Sorted by similarity, highest first, ties by position.
pub async fn find_similar(
    classifier: &mut EmbeddingClassifier,
    txns: &[Transaction],
    target: usize,
    category: Category,
    config: &PropagationConfig,
) -> Vec<Candidate> {
    let Some(anchor) = txns.get(target) else {
        warn!(target, "correction target out of range");
        return Vec::new();
    };
    let Some(anchor_vec) = classifier.vector_for(&CacheKey::for_transaction(anchor)).await else {
        debug!(id = %anchor.id, "no vector for corrected transaction; nothing to propagate");
        return Vec::new();
    };

    let pool: Vec<(usize, CacheKey)> = txns
        .iter()
        .enumerate()
        .filter(|(i, t)| *i != target && !t.hidden && t.category != category)
        .map(|(i, t)| (i, CacheKey::for_transaction(t)))
        .collect();

    let cached = pool.iter().filter(|(_, k)| classifier.cache().contains(k)).count();
    if !pool.is_empty() && (cached as f32) < config.min_cached_ratio * pool.len() as f32 {
        let mut missing: Vec<CacheKey> = pool
            .iter()
            .map(|(_, k)| k)
            .filter(|k| !classifier.cache().contains(k))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        debug!(cached, pool = pool.len(), missing = missing.len(), "computing missing vectors before matching");
        compute_in_batches(classifier, &missing, config).await;
    }

    let mut out: Vec<Candidate> = pool
        .into_iter()
        .filter_map(|(i, key)| {
            let v = classifier.cache().get(&key)?;
            let similarity = cosine(&anchor_vec, v);
            (similarity >= config.similarity_threshold).then(|| Candidate {
                id: txns[i].id.clone(),
                index: i,
                similarity,
                current: txns[i].category,
            })
        })
        .collect();
    out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then(a.index.cmp(&b.index)));

    info!(id = %anchor.id, category = %category, candidates = out.len(), "similar transactions found");
    out
}

/// Embed `keys` batch by batch, yielding between batches. A batch that runs
/// over the time budget halves the size of the next one.
async fn compute_in_batches(classifier: &mut EmbeddingClassifier, keys: &[CacheKey], config: &PropagationConfig) {
    let budget = Duration::from_millis(config.batch_budget_ms);
    let mut size = config.batch_size.max(1);
    let mut rest = keys;
    while !rest.is_empty() {
        let (batch, tail) = rest.split_at(size.min(rest.len()));
        let started = Instant::now();
        classifier.compute_vectors(batch).await;
        let elapsed = started.elapsed();
        if elapsed > budget && size > 1 {
            size /= 2;
            debug!(elapsed_ms = elapsed.as_millis() as u64, next_batch = size, "embedding batch over budget");
        }
        rest = tail;
        tokio::task::yield_now().await;
    }
}

/// Record a manual correction on `txns[target]` and return the candidates
/// that should get the same category.
pub async fn correct_and_propose(
    classifier: &mut EmbeddingClassifier,
    txns: &mut [Transaction],
    target: usize,
    category: Category,
    config: &PropagationConfig,
) -> Vec<Candidate> {
    let Some(txn) = txns.get_mut(target) else {
        warn!(target, "correction target out of range");
        return Vec::new();
    };
    txn.set_category(category, CategorySource::User);
    let description = txn.description.clone();
    classifier.learn(&description, category).await;
    find_similar(classifier, txns, target, category, config).await
}

/// Apply confirmed (transaction id, category) pairs as user corrections.
/// Returns how many transactions changed; unknown ids are skipped.
pub async fn apply_bulk_correction(
    classifier: &mut EmbeddingClassifier,
    txns: &mut [Transaction],
    pairs: &[(String, Category)],
) -> usize {
    let mut applied = 0;
    for (id, category) in pairs {
        let Some(txn) = txns.iter_mut().find(|t| &t.id == id) else {
            warn!(id = %id, "bulk correction for unknown transaction");
            continue;
        };
        txn.set_category(*category, CategorySource::User);
        let description = txn.description.clone();
        classifier.learn(&description, *category).await;
        applied += 1;
    }
    info!(applied, requested = pairs.len(), "bulk correction applied");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;
    use penny_core::StatementKind;

    use crate::classifier::tests::{classifier_with, FakeEmbedder};
    use crate::vector::normalized;

    fn txn(id: &str, desc: &str, category: Category) -> Transaction {
        let mut t = Transaction::new(
            id,
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            desc,
            -12.5,
            StatementKind::CreditCard,
            "s",
        );
        t.set_category(category, CategorySource::Rule);
        t
    }

    fn grab_fixture() -> (Arc<FakeEmbedder>, Vec<Transaction>) {
        let fake = Arc::new(FakeEmbedder::with(&[
            ("GRAB* RIDE 12345", normalized(vec![1.0, 0.05, 0.0])),
            ("GRAB* RIDE 67890", normalized(vec![1.0, 0.0, 0.05])),
            ("GRAB* RIDE 55555", normalized(vec![1.0, 0.0, 0.0])),
            ("NETFLIX.COM", normalized(vec![0.0, 1.0, 0.0])),
        ]));
        let mut txns = vec![
            txn("s-0001", "GRAB* RIDE 12345", Category::Transport),
            txn("s-0002", "GRAB* RIDE 67890", Category::Transport),
            txn("s-0003", "GRAB* RIDE 55555", Category::Transport),
            txn("s-0004", "NETFLIX.COM", Category::Subscriptions),
        ];
        txns[2].hidden = true;
        (fake, txns)
    }

    async fn warm(c: &mut EmbeddingClassifier, txns: &[Transaction]) {
        let keys: Vec<CacheKey> = txns.iter().map(CacheKey::for_transaction).collect();
        c.compute_vectors(&keys).await;
    }

    #[tokio::test]
    async fn test_similar_rides_find_each_other() {
        let (fake, txns) = grab_fixture();
        let mut c = classifier_with(fake);
        c.init().await;
        warm(&mut c, &txns).await;
        let config = PropagationConfig::default();

        let from_first = find_similar(&mut c, &txns, 0, Category::Travel, &config).await;
        assert_eq!(from_first.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1]);
        assert_eq!(from_first[0].id, "s-0002");
        assert_eq!(from_first[0].current, Category::Transport);
        assert!(from_first[0].similarity >= 0.85);

        let from_second = find_similar(&mut c, &txns, 1, Category::Travel, &config).await;
        assert_eq!(from_second.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0]);
    }

    #[tokio::test]
    async fn test_hidden_and_same_category_never_proposed() {
        let (fake, mut txns) = grab_fixture();
        let mut c = classifier_with(fake);
        c.init().await;
        warm(&mut c, &txns).await;
        let config = PropagationConfig::default();

        let found = find_similar(&mut c, &txns, 0, Category::Travel, &config).await;
        assert!(found.iter().all(|c| c.index != 2));

        txns[1].set_category(Category::Travel, CategorySource::User);
        let found = find_similar(&mut c, &txns, 0, Category::Travel, &config).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_sorted_by_similarity_then_index() {
        let fake = Arc::new(FakeEmbedder::with(&[
            ("A", normalized(vec![1.0, 0.0])),
            ("B", normalized(vec![1.0, 0.2])),
            ("C", normalized(vec![1.0, 0.0])),
            ("D", normalized(vec![1.0, 0.0])),
        ]));
        let txns = vec![
            txn("s-0001", "A", Category::Other),
            txn("s-0002", "B", Category::Other),
            txn("s-0003", "C", Category::Other),
            txn("s-0004", "D", Category::Other),
        ];
        let mut c = classifier_with(fake);
        c.init().await;
        warm(&mut c, &txns).await;

        let found = find_similar(&mut c, &txns, 0, Category::Shopping, &PropagationConfig::default()).await;
        assert_eq!(found.iter().map(|c| c.index).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_mostly_uncached_pool_is_computed_in_batches() {
        let (fake, txns) = grab_fixture();
        let mut c = classifier_with(fake.clone());
        c.init().await;
        let config = PropagationConfig { batch_size: 1, ..Default::default() };
        let before = fake.calls();

        let found = find_similar(&mut c, &txns, 0, Category::Travel, &config).await;
        assert_eq!(found.len(), 1);
        // anchor, then one call per missing pool entry (hidden one excluded)
        assert_eq!(fake.calls() - before, 3);
    }

    #[tokio::test]
    async fn test_mostly_cached_pool_skips_uncached() {
        let (fake, txns) = grab_fixture();
        let mut c = classifier_with(fake.clone());
        c.init().await;
        // anchor and the Netflix entry cached: 1 of 2 pool entries
        warm(&mut c, &[txns[0].clone(), txns[3].clone()]).await;
        let before = fake.texts_embedded.load(Ordering::SeqCst);

        let found = find_similar(&mut c, &txns, 0, Category::Travel, &PropagationConfig::default()).await;
        assert!(found.is_empty());
        assert_eq!(fake.texts_embedded.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_correct_then_apply() {
        let (fake, mut txns) = grab_fixture();
        let mut c = classifier_with(fake);
        c.init().await;
        warm(&mut c, &txns).await;
        let config = PropagationConfig::default();

        let candidates = correct_and_propose(&mut c, &mut txns, 0, Category::Travel, &config).await;
        assert_eq!(txns[0].category, Category::Travel);
        assert_eq!(txns[0].category_source, CategorySource::User);
        assert_eq!(candidates.len(), 1);
        // proposals are not applied by themselves
        assert_eq!(txns[1].category, Category::Transport);

        let pairs: Vec<(String, Category)> = candidates
            .iter()
            .map(|cand| (cand.id.clone(), Category::Travel))
            .chain(std::iter::once(("missing".to_string(), Category::Travel)))
            .collect();
        let applied = apply_bulk_correction(&mut c, &mut txns, &pairs).await;
        assert_eq!(applied, 1);
        assert_eq!(txns[1].category, Category::Travel);
        assert_eq!(txns[1].category_source, CategorySource::User);
        assert_eq!(c.cache().correction("GRAB* RIDE 67890"), Some(Category::Travel));

        c.cache().flush().await;
    }
}
