//! Collection manager behaviour against scripted store responses

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termweave::store::{
    AnnRequest, CollectionManager, CollectionSchema, FilterExpr, Hit, IndexParams,
    LocalVectorStore, Metric, Record, Row, StoreError, StoreSettings, VectorPoint,
    VectorStoreClient,
};

/// Local store that can reject its first insert with a schema error and
/// report row counts lagging behind the real ones
#[derive(Default)]
struct ScriptedStore {
    inner: LocalVectorStore,
    reject_first_insert: AtomicBool,
    fail_inserts: AtomicBool,
    /// Visible rows grow by one per `row_count` call
    slow_rows: bool,
    /// Visible rows stay at zero
    stalled_rows: bool,
    creates: AtomicUsize,
    drops: AtomicUsize,
    inserts: AtomicUsize,
    count_calls: AtomicU64,
}

impl ScriptedStore {
    fn rejecting_first_insert() -> Self {
        let store = Self::default();
        store.reject_first_insert.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl VectorStoreClient for ScriptedStore {
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
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(name, schema).await
    }

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        self.drops.fetch_add(1, Ordering::SeqCst);
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
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.reject_first_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::DimensionMismatch {
                expected: 768,
                actual: rows.first().map_or(0, |r| r.vector.len()),
            });
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(name, rows).await
    }

    async fn flush(&self, name: &str) -> Result<(), StoreError> {
        self.inner.flush(name).await
    }

    async fn row_count(&self, name: &str) -> Result<u64, StoreError> {
        let call = self.count_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let actual = self.inner.row_count(name).await?;
        if self.stalled_rows {
            Ok(0)
        } else if self.slow_rows {
            Ok(actual.min(call))
        } else {
            Ok(actual)
        }
    }

    async fn search(&self, name: &str, request: AnnRequest) -> Result<Vec<Hit>, StoreError> {
        self.inner.search(name, request).await
    }

    async fn query(
        &self,
        name: &str,
        filter: &FilterExpr,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.query(name, filter, limit).await
    }
}

fn settings(max_attempts: u32) -> StoreSettings {
    StoreSettings {
        persist_poll_interval: Duration::from_millis(1),
        persist_max_attempts: max_attempts,
        ..StoreSettings::default()
    }
}

fn points(n: usize) -> Vec<VectorPoint> {
    (0..n)
        .map(|i| VectorPoint::new(format!("p{}", i), format!("entry {}", i), vec![i as f32 + 1.0, 1.0]))
        .collect()
}

#[tokio::test]
async fn test_schema_error_on_insert_recreates_and_retries_once() {
    let store = Arc::new(ScriptedStore::rejecting_first_insert());
    let manager = CollectionManager::new(store.clone(), settings(20));

    let report = manager.upsert_vectors("tm", points(3)).await.unwrap();

    assert_eq!(report.written, 3);
    assert_eq!(report.row_count, 3);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
    assert_eq!(store.drops.load(Ordering::SeqCst), 1);
    assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    assert_eq!(store.describe_collection("tm").await.unwrap().vector_dim(), Some(2));
}

#[tokio::test]
async fn test_non_schema_insert_error_is_not_retried() {
    let store = Arc::new(ScriptedStore::default());
    store.fail_inserts.store(true, Ordering::SeqCst);
    let manager = CollectionManager::new(store.clone(), settings(20));

    let err = manager.upsert_vectors("tm", points(2)).await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(store.drops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_row_count_progress_extends_polling() {
    let store = Arc::new(ScriptedStore {
        slow_rows: true,
        ..ScriptedStore::default()
    });
    let manager = CollectionManager::new(store.clone(), settings(2));

    let report = manager.upsert_vectors("tm", points(8)).await.unwrap();

    // Two attempts alone would stop at 2 visible rows
    assert_eq!(report.row_count, 8);
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_stalled_row_count_gives_up_without_error() {
    let store = Arc::new(ScriptedStore {
        stalled_rows: true,
        ..ScriptedStore::default()
    });
    let manager = CollectionManager::new(store.clone(), settings(3));

    let report = manager.upsert_vectors("tm", points(2)).await.unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(report.row_count, 0);
    // Three polls plus the final check
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_huge_finite_components_upsert_and_search() {
    let store = Arc::new(LocalVectorStore::new());
    let manager = CollectionManager::new(store.clone(), settings(5));

    let report = manager
        .upsert_vectors(
            "tm",
            vec![
                VectorPoint::new("a", "big", vec![1e20, 1.0]),
                VectorPoint::new("b", "also big", vec![2e20, 1.0]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(report.row_count, 2);

    let hits = store
        .search(
            "tm",
            AnnRequest {
                vector: vec![1.0, 0.0],
                limit: 2,
                metric: Metric::Cosine,
                ef: 64,
                filter: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.score.is_finite()));
}

#[tokio::test]
async fn test_oversized_hnsw_m_is_an_error_not_an_exit() {
    let store = Arc::new(LocalVectorStore::new());
    let manager = CollectionManager::new(
        store,
        StoreSettings {
            hnsw_m: 300,
            ..settings(5)
        },
    );

    let err = manager.upsert_vectors("tm", points(2)).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidIndex { .. }));
}
