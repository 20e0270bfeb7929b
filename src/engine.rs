//! Engine facade
//!
//! One place that owns the injected store client and exposes the collection,
//! upsert and search operations over it.

use std::sync::Arc;

use crate::retrieval::{
    HybridQuery, HybridSearcher, KeywordQuery, SearchResult, VectorQuery,
};
use crate::store::{
    CollectionManager, LocalVectorStore, Metric, SchemaReconciliation, StoreError, StoreSettings,
    UpsertReport, VectorPoint, VectorStoreClient,
};

pub struct Engine {
    client: Arc<dyn VectorStoreClient>,
    manager: Arc<CollectionManager>,
    searcher: HybridSearcher,
}

impl Engine {
    pub fn new(client: Arc<dyn VectorStoreClient>, settings: StoreSettings) -> Self {
        Self {
            manager: Arc::new(CollectionManager::new(client.clone(), settings)),
            searcher: HybridSearcher::new(client.clone()),
            client,
        }
    }

    /// Engine over a fresh in-process store
    pub fn local(settings: StoreSettings) -> Self {
        Self::new(Arc::new(LocalVectorStore::new()), settings)
    }

    pub fn client(&self) -> &Arc<dyn VectorStoreClient> {
        &self.client
    }

    /// Shared manager, e.g. for an [`IngestPipeline`](crate::embedding::IngestPipeline)
    pub fn manager(&self) -> Arc<CollectionManager> {
        self.manager.clone()
    }

    pub async fn ensure_collection(
        &self,
        collection: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), StoreError> {
        self.manager.ensure_collection(collection, dim, metric).await
    }

    pub async fn reconcile_schema(
        &self,
        collection: &str,
        dim: usize,
    ) -> Result<SchemaReconciliation, StoreError> {
        self.manager.reconcile_schema(collection, dim).await
    }

    pub async fn upsert_vectors(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<UpsertReport, StoreError> {
        self.manager.upsert_vectors(collection, points).await
    }

    pub async fn search_vectors(
        &self,
        query: &VectorQuery<'_>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.searcher.vector_searcher().search(query).await
    }

    pub async fn search_keywords(
        &self,
        query: &KeywordQuery<'_>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.searcher.keyword_searcher().search(query).await
    }

    pub async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<SearchResult>, StoreError> {
        self.searcher.search(query).await
    }
}
