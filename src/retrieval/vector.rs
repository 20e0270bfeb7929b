//! Nearest-neighbour search over a collection

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::{AnnRequest, StoreError, VectorStoreClient};

use super::keyword::MAX_K;
use super::types::{SearchResult, VectorQuery};

/// HNSW search breadth when the caller does not set one
pub const DEFAULT_EF: usize = 128;

#[derive(Clone)]
pub struct VectorSearcher {
    client: Arc<dyn VectorStoreClient>,
}

impl VectorSearcher {
    pub fn new(client: Arc<dyn VectorStoreClient>) -> Self {
        Self { client }
    }

    /// Top-`k` results best-first with the metric's native scores.
    ///
    /// A missing or empty collection yields an empty list. Load and row-count
    /// failures are logged and the search is attempted anyway.
    pub async fn search(&self, query: &VectorQuery<'_>) -> Result<Vec<SearchResult>, StoreError> {
        let k = query.k.clamp(1, MAX_K);
        let ef = query.ef.unwrap_or(DEFAULT_EF);

        if !self.client.has_collection(query.collection).await? {
            info!("Collection {} does not exist, no vector results", query.collection);
            return Ok(Vec::new());
        }

        if let Err(e) = self.client.load_collection(query.collection).await {
            warn!("Loading {} before search failed: {}", query.collection, e);
        }
        match self.client.row_count(query.collection).await {
            Ok(0) => {
                info!("Collection {} is empty", query.collection);
                return Ok(Vec::new());
            }
            Ok(rows) => debug!("Searching {} rows in {} (k={}, ef={})", rows, query.collection, k, ef),
            Err(e) => warn!("Row count for {} unavailable: {}", query.collection, e),
        }

        let hits = self
            .client
            .search(
                query.collection,
                AnnRequest {
                    vector: query.vector.to_vec(),
                    limit: k,
                    metric: query.metric,
                    ef,
                    filter: query.filter.cloned(),
                },
            )
            .await?;

        Ok(hits.into_iter().map(SearchResult::from_hit).collect())
    }
}
