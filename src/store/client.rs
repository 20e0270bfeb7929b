//! Vector store client abstraction
//!
//! Every store operation the engine needs goes through [`VectorStoreClient`], so
//! the retrieval and ingestion code can run against a remote vector database or
//! the in-process [`LocalVectorStore`](super::LocalVectorStore) unchanged.

use async_trait::async_trait;

use super::filter::FilterExpr;
use super::schema::{CollectionSchema, Hit, IndexParams, Metric, Record, Row};
use super::StoreError;

/// Parameters of one nearest-neighbour search
#[derive(Debug, Clone)]
pub struct AnnRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub metric: Metric,
    /// HNSW search breadth
    pub ef: usize,
    pub filter: Option<FilterExpr>,
}

#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError>;

    async fn describe_collection(&self, name: &str) -> Result<CollectionSchema, StoreError>;

    async fn create_collection(&self, name: &str, schema: CollectionSchema)
        -> Result<(), StoreError>;

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError>;

    async fn release_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] when the vector field is already indexed
    async fn create_index(&self, name: &str, params: IndexParams) -> Result<(), StoreError>;

    async fn load_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Insert or replace rows by id; returns the number of rows written
    async fn insert(&self, name: &str, rows: Vec<Row>) -> Result<usize, StoreError>;

    async fn flush(&self, name: &str) -> Result<(), StoreError>;

    /// Persisted row count
    async fn row_count(&self, name: &str) -> Result<u64, StoreError>;

    /// Best-first hits with native metric scores
    async fn search(&self, name: &str, request: AnnRequest) -> Result<Vec<Hit>, StoreError>;

    /// Scalar scan returning at most `limit` matching records
    async fn query(
        &self,
        name: &str,
        filter: &FilterExpr,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;
}
