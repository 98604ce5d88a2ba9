use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::embedding::{Embedder, EmbeddingError, StubEmbedder};
use crate::vectordb::MockVectorIndex;

use super::*;

const DIM: usize = 4;

fn config() -> CacheConfig {
    CacheConfig::default()
        .collection_name("answers_test")
        .vector_size(DIM as u64)
}

struct Harness {
    index: Arc<MockVectorIndex>,
    cache: SemanticResponseCache<Arc<MockVectorIndex>, StubEmbedder>,
}

async fn harness(embedder: StubEmbedder, config: CacheConfig) -> Harness {
    let index = Arc::new(MockVectorIndex::new());
    let cache = SemanticResponseCache::new(Arc::clone(&index), Arc::new(embedder), config)
        .expect("config should validate");
    cache.ensure_collection().await.unwrap();

    Harness { index, cache }
}

/// Embedder with three fixed queries at known similarities:
/// `q_exact` ~ 1.0, `q_near` ~ 0.99, `q_far` ~ 0.5 against the base query.
fn graded_embedder() -> StubEmbedder {
    let base = vec![1.0, 0.0, 0.0, 0.0];
    let near = vec![0.99, (1.0_f32 - 0.99 * 0.99).sqrt(), 0.0, 0.0];
    let far = vec![0.5, (0.75_f32).sqrt(), 0.0, 0.0];

    StubEmbedder::new(DIM)
        .with_canned("price of H6?", base)
        .with_canned("price of h6", near)
        .with_canned("service intervals?", far)
}

#[tokio::test]
async fn test_exact_repeat_hits_session() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set(
            "price of H6?",
            "Around 30k.",
            Some("s1"),
            CacheScope::Session,
            None,
        )
        .await
        .unwrap();

    let lookup = h.cache.get("price of H6?", Some("s1")).await;

    let answer = lookup.into_answer().expect("exact repeat must hit");
    assert_eq!(answer.response, "Around 30k.");
    assert_eq!(answer.scope, CacheScope::Session);
    assert_eq!(answer.session_id.as_deref(), Some("s1"));
    assert!(answer.similarity >= 0.99);
}

#[tokio::test]
async fn test_near_paraphrase_hits_far_query_misses() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set(
            "price of H6?",
            "Around 30k.",
            Some("s1"),
            CacheScope::Session,
            None,
        )
        .await
        .unwrap();

    // similarity ~0.99 >= 0.96
    let near = h.cache.get("price of h6", Some("s1")).await;
    assert!(near.is_hit());

    // similarity ~0.5 < 0.96
    let far = h.cache.get("service intervals?", Some("s1")).await;
    assert!(!far.is_hit());
}

#[tokio::test]
async fn test_session_entries_invisible_to_other_sessions() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set(
            "price of H6?",
            "Around 30k.",
            Some("s1"),
            CacheScope::Session,
            None,
        )
        .await
        .unwrap();

    assert!(!h.cache.get("price of H6?", Some("s2")).await.is_hit());
    // and to session-less lookups
    assert!(!h.cache.get("price of H6?", None).await.is_hit());
}

#[tokio::test]
async fn test_global_pool_answers_any_session() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set("price of H6?", "Around 30k.", None, CacheScope::Global, None)
        .await
        .unwrap();

    let from_session = h.cache.get("price of h6", Some("s1")).await;
    let answer = from_session.into_answer().expect("global must serve sessions");
    assert_eq!(answer.scope, CacheScope::Global);
    assert!(answer.session_id.is_none());

    assert!(h.cache.get("price of H6?", None).await.is_hit());
}

#[tokio::test]
async fn test_session_miss_falls_through_to_global() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set("price of H6?", "Global answer.", None, CacheScope::Global, None)
        .await
        .unwrap();
    h.cache
        .set(
            "service intervals?",
            "Session answer.",
            Some("s1"),
            CacheScope::Session,
            None,
        )
        .await
        .unwrap();

    // session partition only holds a dissimilar entry; the global one wins
    let lookup = h.cache.get("price of h6", Some("s1")).await;
    let answer = lookup.into_answer().expect("should fall through to global");
    assert_eq!(answer.response, "Global answer.");
}

#[tokio::test]
async fn test_expired_session_entry_is_lazily_evicted() {
    let h = harness(graded_embedder(), config()).await;

    let stale = Utc::now() - chrono::Duration::hours(13);
    h.cache
        .write_entry(
            "price of H6?",
            "Stale.",
            Some("s1"),
            CacheScope::Session,
            None,
            stale,
        )
        .await
        .unwrap();
    assert_eq!(h.index.point_count("answers_test"), Some(1));

    let lookup = h.cache.get("price of H6?", Some("s1")).await;

    assert!(!lookup.is_hit());
    // lazy eviction removed the entry
    assert_eq!(h.index.point_count("answers_test"), Some(0));
}

#[tokio::test]
async fn test_fresh_session_entry_survives_lookup() {
    let h = harness(graded_embedder(), config()).await;

    let recent = Utc::now() - chrono::Duration::hours(1);
    h.cache
        .write_entry(
            "price of H6?",
            "Fresh.",
            Some("s1"),
            CacheScope::Session,
            None,
            recent,
        )
        .await
        .unwrap();

    assert!(h.cache.get("price of H6?", Some("s1")).await.is_hit());
    assert_eq!(h.index.point_count("answers_test"), Some(1));
}

#[tokio::test]
async fn test_session_scope_requires_session_id() {
    let h = harness(graded_embedder(), config()).await;

    let result = h
        .cache
        .set("q", "a", None, CacheScope::Session, None)
        .await;

    assert!(matches!(result, Err(CacheError::MissingSessionId)));
}

#[tokio::test]
async fn test_exact_repeat_overwrites_instead_of_duplicating() {
    let h = harness(graded_embedder(), config()).await;

    let id1 = h
        .cache
        .set("price of H6?", "Old.", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();
    let id2 = h
        .cache
        .set("price of H6?", "New.", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();

    assert_eq!(id1, id2);
    assert_eq!(h.index.point_count("answers_test"), Some(1));

    let answer = h
        .cache
        .get("price of H6?", Some("s1"))
        .await
        .into_answer()
        .unwrap();
    assert_eq!(answer.response, "New.");
}

#[tokio::test]
async fn test_same_query_different_scopes_coexist() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set("price of H6?", "Session.", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();
    h.cache
        .set("price of H6?", "Global.", None, CacheScope::Global, None)
        .await
        .unwrap();

    assert_eq!(h.index.point_count("answers_test"), Some(2));
}

#[tokio::test]
async fn test_clear_session_only_touches_that_session() {
    let h = harness(graded_embedder(), config()).await;

    h.cache
        .set("price of H6?", "a", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();
    h.cache
        .set("service intervals?", "b", Some("s2"), CacheScope::Session, None)
        .await
        .unwrap();
    h.cache
        .set("price of h6", "c", None, CacheScope::Global, None)
        .await
        .unwrap();

    h.cache.clear_session("s1").await.unwrap();

    let stats = h.cache.stats().await.unwrap();
    assert_eq!(stats.session_entries, 1);
    assert_eq!(stats.global_entries, 1);
    assert!(h.cache.get("service intervals?", Some("s2")).await.is_hit());
}

#[tokio::test]
async fn test_cleanup_expired_sessions() {
    let h = harness(graded_embedder(), config()).await;

    let stale = Utc::now() - chrono::Duration::hours(13);
    h.cache
        .write_entry("price of H6?", "stale", Some("s1"), CacheScope::Session, None, stale)
        .await
        .unwrap();
    h.cache
        .set("service intervals?", "fresh", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();
    h.cache
        .set("price of h6", "global", None, CacheScope::Global, None)
        .await
        .unwrap();

    let removed = h.cache.cleanup_expired_sessions().await.unwrap();

    assert_eq!(removed, 1);
    let stats = h.cache.stats().await.unwrap();
    assert_eq!(stats.session_entries, 1);
    // global entries never expire
    assert_eq!(stats.global_entries, 1);
}

#[tokio::test]
async fn test_stats_counts_by_scope() {
    let h = harness(graded_embedder(), config()).await;

    let stats = h.cache.stats().await.unwrap();
    assert_eq!(stats, CacheStats::default());

    h.cache
        .set("price of H6?", "a", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();
    h.cache
        .set("price of h6", "b", None, CacheScope::Global, None)
        .await
        .unwrap();

    let stats = h.cache.stats().await.unwrap();
    assert_eq!(stats.session_entries, 1);
    assert_eq!(stats.global_entries, 1);
    assert_eq!(stats.total(), 2);
}

#[tokio::test]
async fn test_metadata_round_trips() {
    let h = harness(graded_embedder(), config()).await;

    let metadata: HashMap<String, String> =
        [("model".to_string(), "small".to_string())].into_iter().collect();

    h.cache
        .set(
            "price of H6?",
            "a",
            Some("s1"),
            CacheScope::Session,
            Some(metadata),
        )
        .await
        .unwrap();

    let answer = h
        .cache
        .get("price of H6?", Some("s1"))
        .await
        .into_answer()
        .unwrap();
    assert_eq!(answer.metadata.get("model").map(String::as_str), Some("small"));
}

#[tokio::test]
async fn test_query_preview_is_truncated() {
    let h = harness(StubEmbedder::new(DIM), config()).await;

    let long_query = "x".repeat(500);
    h.cache
        .set(&long_query, "a", Some("s1"), CacheScope::Session, None)
        .await
        .unwrap();

    let answer = h
        .cache
        .get(&long_query, Some("s1"))
        .await
        .into_answer()
        .unwrap();
    assert_eq!(answer.original_query.chars().count(), 256);
    assert_eq!(answer.response, "a");
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embedding_dim(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::InferenceFailed {
            reason: "backend down".to_string(),
        })
    }
}

#[tokio::test]
async fn test_lookup_errors_degrade_to_miss() {
    let index = Arc::new(MockVectorIndex::new());
    let cache = SemanticResponseCache::new(Arc::clone(&index), Arc::new(FailingEmbedder), config())
        .unwrap();
    cache.ensure_collection().await.unwrap();

    // get never errors, even with a broken embedder
    assert!(!cache.get("anything", Some("s1")).await.is_hit());

    // set surfaces the failure: the caller must know the answer was not cached
    let result = cache
        .set("q", "a", Some("s1"), CacheScope::Session, None)
        .await;
    assert!(matches!(result, Err(CacheError::EmbeddingFailed { .. })));
}

#[test]
fn test_config_validation() {
    assert!(config().validate().is_ok());

    let bad = config().similarity_threshold(0.0);
    assert!(matches!(bad.validate(), Err(CacheError::ConfigError { .. })));

    let bad = config().session_ttl(Duration::ZERO);
    assert!(matches!(bad.validate(), Err(CacheError::ConfigError { .. })));

    let bad = config().vector_size(0);
    assert!(matches!(bad.validate(), Err(CacheError::ConfigError { .. })));
}

#[test]
fn test_scope_parse_round_trip() {
    assert_eq!(CacheScope::parse("session"), Some(CacheScope::Session));
    assert_eq!(CacheScope::parse("global"), Some(CacheScope::Global));
    assert_eq!(CacheScope::parse("other"), None);
    assert_eq!(CacheScope::parse(CacheScope::Session.as_str()), Some(CacheScope::Session));
}
