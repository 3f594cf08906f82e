use std::sync::Arc;

use penny_classify::{
    apply_bulk_correction, classify_all, correct_and_propose, ClassifierConfig, EmbeddingCache,
    EmbeddingClassifier, HashEmbedder, KvStore, MemoryStore, PropagationConfig, ServiceState,
};
use penny_core::{Category, CategorySource};
use penny_ingest::{ParserConfig, ParserRegistry};

fn card_statement() -> Vec<String> {
    vec![
        "UNITED OVERSEAS BANK LIMITED Credit Card(s) Statement Statement Date 05 JAN 2025 \
         Post Date Trans Date Description of Transaction Transaction Amount SGD \
         PREVIOUS BALANCE 120.00 \
         02 JAN 31 DEC GRAB* RIDE 12345 SINGAPORE SG 12.50 \
         03 JAN 03 JAN PAYMENT - THANK YOU 120.00 CR \
         04 JAN 02 JAN NETFLIX.COM SINGAPORE 19.98 \
         04 JAN 03 JAN GRAB* RIDE 67890 SINGAPORE SG 9.80 \
         05 JAN 04 JAN GRAB* RIDE 24680 SINGAPORE SG 15.10 \
         SUB TOTAL 57.38 End of Transaction Details"
            .to_string(),
    ]
}

#[tokio::test]
async fn parse_classify_correct_propagate() {
    let registry = ParserRegistry::with_defaults(&ParserConfig::default()).unwrap();
    let mut statement = registry.parse_document(&card_statement()).unwrap();
    assert_eq!(statement.parser_id, "uob");
    assert_eq!(statement.transactions.len(), 5);
    assert!(statement.transactions.iter().all(|t| t.category_source == CategorySource::Rule));

    let store = MemoryStore::new();
    let cache = EmbeddingCache::load(Box::new(store.clone()));
    let mut classifier =
        EmbeddingClassifier::new(Arc::new(HashEmbedder::default()), cache, ClassifierConfig::default());
    assert_eq!(classifier.init().await, ServiceState::Ready);

    // hide one ride: it must never be proposed
    statement.transactions[4].hidden = true;
    let txns = &mut statement.transactions;
    classify_all(&mut classifier, txns).await;

    let candidates =
        correct_and_propose(&mut classifier, txns, 0, Category::Travel, &PropagationConfig::default()).await;
    assert_eq!(txns[0].category, Category::Travel);
    assert_eq!(txns[0].category_source, CategorySource::User);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].index, 3);
    assert!(candidates[0].similarity >= 0.85);

    let pairs: Vec<_> = candidates.iter().map(|c| (c.id.clone(), Category::Travel)).collect();
    assert_eq!(apply_bulk_correction(&mut classifier, txns, &pairs).await, 1);
    assert_eq!(txns[3].category, Category::Travel);
    assert_eq!(txns[4].category_source, CategorySource::Rule);

    classifier.cache().flush().await;
    let persisted = store.load_corrections().unwrap();
    assert_eq!(persisted.get("GRAB* RIDE 12345 SINGAPORE SG"), Some(&Category::Travel));
    assert_eq!(persisted.get("GRAB* RIDE 67890 SINGAPORE SG"), Some(&Category::Travel));

    // a fresh session over the same store recognises the corrected text at once
    let mut next = EmbeddingClassifier::new(
        Arc::new(HashEmbedder::default()),
        EmbeddingCache::load(Box::new(store.clone())),
        ClassifierConfig::default(),
    );
    next.init().await;
    let hit = next.classify_cached("GRAB* RIDE 67890 SINGAPORE SG", None).unwrap();
    assert_eq!(hit.category, Category::Travel);
    assert_eq!(hit.confidence, 1.0);
}

#[cfg(feature = "onnx")]
#[tokio::test]
#[ignore = "downloads the AllMiniLM-L6-v2 model"]
async fn pretrained_model_scores_exemplars() {
    use penny_classify::{build_embedder, EmbeddingConfig, MatchKind};

    let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
    let mut classifier = EmbeddingClassifier::new(embedder, EmbeddingCache::in_memory(), ClassifierConfig::default());
    assert_eq!(classifier.init().await, ServiceState::Ready);

    let res = classifier.classify("Netflix subscription", None).await.unwrap();
    assert_eq!(res.category, Category::Subscriptions);
    assert_eq!(res.matched, MatchKind::Exemplar);
}
