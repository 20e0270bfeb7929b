//! Hybrid retrieval over the in-process store
//!
//! Uses a deterministic hashing embedder and a store wrapper that can be told
//! to fail, so every path runs without a model download.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termweave::embedding::{EmbeddingError, EmbeddingProvider, IngestItem, IngestPipeline};
use termweave::retrieval::{
    FusionMethod, FusionWeights, HybridQuery, HybridSearchConfig, KeywordQuery, MatchType,
    RankFusionParams, ResultSource, SearchMode, VectorQuery,
};
use termweave::store::{
    AnnRequest, CollectionSchema, FilterExpr, FilterField, Hit, IndexParams, LocalVectorStore,
    Metric, Record, Row, StoreError, StoreSettings, VectorPoint, VectorStoreClient,
};
use termweave::Engine;

const DIM: usize = 16;

/// Bag-of-words hashing embedder; texts containing "[no-vector]" embed to nothing
struct HashEmbedder;

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains("[no-vector]") {
            return Ok(Vec::new());
        }
        let mut v = vec![0.0f32; DIM];
        for word in text.split_whitespace() {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                % DIM;
            v[bucket] += 1.0;
        }
        Ok(v)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Store wrapper with switchable failures on the search and scan paths
#[derive(Default)]
struct FlakyStore {
    inner: LocalVectorStore,
    fail_search: AtomicBool,
    fail_query: AtomicBool,
    searches: AtomicUsize,
    queries: AtomicUsize,
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl VectorStoreClient for FlakyStore {
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.has_collection(name).await
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionSchema, StoreError> {
        self.inner.describe_collection(name).await
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
    ) -> Result<(), StoreError> {
        self.inner.create_collection(name, schema).await
    }

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        self.inner.drop_collection(name).await
    }

    async fn release_collection(&self, name: &str) -> Result<(), StoreError> {
        self.inner.release_collection(name).await
    }

    async fn create_index(&self, name: &str, params: IndexParams) -> Result<(), StoreError> {
        self.inner.create_index(name, params).await
    }

    async fn load_collection(&self, name: &str) -> Result<(), StoreError> {
        self.inner.load_collection(name).await
    }

    async fn insert(&self, name: &str, rows: Vec<Row>) -> Result<usize, StoreError> {
        self.inner.insert(name, rows).await
    }

    async fn flush(&self, name: &str) -> Result<(), StoreError> {
        self.inner.flush(name).await
    }

    async fn row_count(&self, name: &str) -> Result<u64, StoreError> {
        self.inner.row_count(name).await
    }

    async fn search(&self, name: &str, request: AnnRequest) -> Result<Vec<Hit>, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.search(name, request).await
    }

    async fn query(
        &self,
        name: &str,
        filter: &FilterExpr,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.query(name, filter, limit).await
    }
}

fn settings() -> StoreSettings {
    StoreSettings {
        persist_poll_interval: Duration::from_millis(1),
        ..StoreSettings::default()
    }
}

const TEXTS: [(&str, &str); 4] = [
    ("tm-1", "a cat sat"),
    ("tm-2", "a dog sat"),
    ("tm-3", "cat cat cat"),
    ("tm-4", "translation memory entry"),
];

async fn seeded() -> (Arc<FlakyStore>, Engine) {
    let store = Arc::new(FlakyStore::default());
    let engine = Engine::new(store.clone(), settings());

    let points: Vec<VectorPoint> = TEXTS
        .iter()
        .map(|(id, text)| {
            VectorPoint::new(*id, *text, HashEmbedder.embed(text).unwrap())
                .with_meta(json!({ "memoryId": "m-1", "sourceLang": "en", "targetLang": "zh" }))
        })
        .collect();
    engine.upsert_vectors("TranslationMemory", points).await.unwrap();

    (store, engine)
}

fn query_vector(text: &str) -> Vec<f32> {
    HashEmbedder.embed(text).unwrap()
}

#[tokio::test]
async fn test_upsert_then_search_returns_exact_match_first() {
    let (_, engine) = seeded().await;
    let vector = query_vector("translation memory entry");

    let results = engine
        .search_vectors(&VectorQuery {
            collection: "TranslationMemory",
            vector: &vector,
            k: 3,
            filter: None,
            metric: Metric::Cosine,
            ef: None,
        })
        .await
        .unwrap();

    assert_eq!(results[0].id, "tm-4");
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[0].source, ResultSource::Vector);
    assert_eq!(results[0].meta.as_ref().unwrap()["targetLang"], "zh");
}

#[tokio::test]
async fn test_keyword_search_ranks_by_term_frequency() {
    let (_, engine) = seeded().await;

    let results = engine
        .search_keywords(&KeywordQuery {
            collection: "TranslationMemory",
            query: "cat",
            k: 10,
            filter: None,
            match_type: MatchType::Contains,
            boost_factor: 1.0,
        })
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["tm-3", "tm-1"]);
    assert_eq!(results[0].highlights, vec!["cat"]);
    assert!(results.iter().all(|r| r.source == ResultSource::Keyword));
}

#[tokio::test]
async fn test_keyword_exact_and_phrase_match_types() {
    let (_, engine) = seeded().await;
    let search = |query: &'static str, match_type| {
        let engine = &engine;
        async move {
            engine
                .search_keywords(&KeywordQuery {
                    collection: "TranslationMemory",
                    query,
                    k: 10,
                    filter: None,
                    match_type,
                    boost_factor: 1.0,
                })
                .await
                .unwrap()
        }
    };

    let exact = search("a dog sat", MatchType::Exact).await;
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].id, "tm-2");

    let phrase = search("cat sat", MatchType::Phrase).await;
    assert_eq!(phrase.len(), 1);
    assert_eq!(phrase[0].id, "tm-1");
}

#[tokio::test]
async fn test_vector_mode_skips_keyword_path() {
    let (store, engine) = seeded().await;
    let mut config = HybridSearchConfig::default();
    config.mode = SearchMode::Vector;
    config.keyword_search.enabled = true;

    let request = HybridQuery::new("TranslationMemory", "cat")
        .with_vector(query_vector("cat cat cat"))
        .with_config(config);
    let results = engine.hybrid_search(&request).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.source == ResultSource::Vector));
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    assert_eq!(store.searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_keyword_mode_ignores_query_vector() {
    let (store, engine) = seeded().await;
    let mut config = HybridSearchConfig::default();
    config.mode = SearchMode::Keyword;

    let request = HybridQuery::new("TranslationMemory", "dog")
        .with_vector(query_vector("dog"))
        .with_config(config);
    let results = engine.hybrid_search(&request).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "tm-2");
    assert_eq!(store.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hybrid_rrf_prefers_results_in_both_lists() {
    let (_, engine) = seeded().await;
    let mut config = HybridSearchConfig::default();
    config.fusion_strategy = Some(FusionMethod::ReciprocalRankFusion {
        rank_fusion: RankFusionParams { k: 60.0 },
    });

    let request = HybridQuery::new("TranslationMemory", "cat")
        .with_vector(query_vector("cat cat cat"))
        .with_config(config);
    let results = engine.hybrid_search(&request).await.unwrap();

    assert_eq!(results[0].id, "tm-3");
    assert!(results[0].vector_score.is_some());
    assert!(results[0].keyword_score.is_some());
    assert!(results.iter().all(|r| r.source == ResultSource::Hybrid));
}

#[tokio::test]
async fn test_weighted_vector_only_matches_vector_ranking() {
    let (_, engine) = seeded().await;
    let vector = query_vector("a cat sat");

    let vector_only = engine
        .search_vectors(&VectorQuery {
            collection: "TranslationMemory",
            vector: &vector,
            k: 4,
            filter: None,
            metric: Metric::Cosine,
            ef: None,
        })
        .await
        .unwrap();

    let mut config = HybridSearchConfig::default();
    config.vector_search.top_k = 4;
    config.fusion_strategy = Some(FusionMethod::WeightedSum {
        weights: FusionWeights {
            vector_weight: 1.0,
            keyword_weight: 0.0,
        },
    });
    let request = HybridQuery::new("TranslationMemory", "")
        .with_vector(vector.clone())
        .with_config(config);
    let fused = engine.hybrid_search(&request).await.unwrap();

    let a: Vec<&str> = vector_only.iter().map(|r| r.id.as_str()).collect();
    let b: Vec<&str> = fused.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(a[0], b[0]);
    assert_eq!(a.len(), b.len());
}

#[tokio::test]
async fn test_one_failing_path_degrades_to_the_other() {
    let (store, engine) = seeded().await;
    store.fail_query.store(true, Ordering::SeqCst);

    let request =
        HybridQuery::new("TranslationMemory", "cat").with_vector(query_vector("cat cat cat"));
    let results = engine.hybrid_search(&request).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.keyword_score.is_none()));
    assert!(results.iter().all(|r| r.vector_score.is_some()));
}

#[tokio::test]
async fn test_all_paths_failing_is_an_error() {
    let (store, engine) = seeded().await;
    store.fail_query.store(true, Ordering::SeqCst);
    store.fail_search.store(true, Ordering::SeqCst);

    let request =
        HybridQuery::new("TranslationMemory", "cat").with_vector(query_vector("cat cat cat"));
    let err = engine.hybrid_search(&request).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[tokio::test]
async fn test_missing_collection_is_empty_not_error() {
    let engine = Engine::local(settings());
    let request = HybridQuery::new("Nowhere", "cat").with_vector(query_vector("cat"));
    let results = engine.hybrid_search(&request).await.unwrap();
    assert!(results.is_empty());
    assert!(!engine.client().has_collection("Nowhere").await.unwrap());
}

#[tokio::test]
async fn test_caller_filter_applies_to_both_paths() {
    let (_, engine) = seeded().await;
    let filter = FilterExpr::eq(FilterField::Id, "tm-1");

    let request = HybridQuery::new("TranslationMemory", "cat")
        .with_vector(query_vector("cat cat cat"))
        .with_filter(filter);
    let results = engine.hybrid_search(&request).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "tm-1");
}

#[tokio::test]
async fn test_dimension_change_rebuilds_collection() {
    let (store, engine) = seeded().await;
    engine
        .upsert_vectors("TranslationMemory", vec![VectorPoint::new("new", "wide", vec![1.0; 32])])
        .await
        .unwrap();

    let schema = store.describe_collection("TranslationMemory").await.unwrap();
    assert_eq!(schema.vector_dim(), Some(32));
    assert_eq!(store.row_count("TranslationMemory").await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_batch_writes_nothing() {
    let (store, engine) = seeded().await;
    let err = engine
        .upsert_vectors(
            "TranslationMemory",
            vec![
                VectorPoint::new("ok", "fine", vec![0.5; DIM]),
                VectorPoint::new("", "no id", vec![0.5; DIM]),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(err, StoreError::InvalidPoints { invalid: 1, total: 2 });
    assert_eq!(store.row_count("TranslationMemory").await.unwrap(), TEXTS.len() as u64);
}

#[tokio::test]
async fn test_ingest_pipeline_batches_and_skips() {
    let engine = Engine::local(settings());
    let pipeline = IngestPipeline::new(Arc::new(HashEmbedder), engine.manager(), "TranslationMemory")
        .with_batch_size(2);

    let items = vec![
        IngestItem::new("hello world").with_id("fixed-id"),
        IngestItem::new("term base entry"),
        IngestItem::new("   "),
        IngestItem::new("[no-vector] skipped"),
        IngestItem::new("glossary").with_meta(json!({ "memoryId": "m-2" })),
    ];
    let report = pipeline.process(items).await.unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);

    let records = engine
        .client()
        .query("TranslationMemory", &FilterExpr::all(), 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().any(|r| r.id == "fixed-id"));
    assert!(records
        .iter()
        .filter(|r| r.id != "fixed-id")
        .all(|r| uuid::Uuid::parse_str(&r.id).is_ok()));
}
