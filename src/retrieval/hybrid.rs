//! Hybrid search combining vector and keyword search

use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{StoreError, VectorStoreClient};

use super::fusion::fuse;
use super::keyword::KeywordSearcher;
use super::types::{HybridQuery, KeywordQuery, SearchMode, SearchResult, VectorQuery};
use super::vector::VectorSearcher;

/// Result of one search path
enum PathOutcome {
    Skipped,
    Done(Vec<SearchResult>),
    Failed(StoreError),
}

impl PathOutcome {
    fn from_result(path: &str, result: Option<Result<Vec<SearchResult>, StoreError>>) -> Self {
        match result {
            None => PathOutcome::Skipped,
            Some(Ok(results)) => PathOutcome::Done(results),
            Some(Err(e)) => {
                warn!("{} search failed, continuing without it: {}", path, e);
                PathOutcome::Failed(e)
            }
        }
    }

    fn attempted(&self) -> bool {
        !matches!(self, PathOutcome::Skipped)
    }

    fn error(&self) -> Option<&StoreError> {
        match self {
            PathOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    fn into_results(self) -> Vec<SearchResult> {
        match self {
            PathOutcome::Done(results) => results,
            _ => Vec::new(),
        }
    }
}

/// Runs the enabled search paths concurrently and fuses their results
#[derive(Clone)]
pub struct HybridSearcher {
    vector: VectorSearcher,
    keyword: KeywordSearcher,
}

impl HybridSearcher {
    pub fn new(client: Arc<dyn VectorStoreClient>) -> Self {
        Self {
            vector: VectorSearcher::new(client.clone()),
            keyword: KeywordSearcher::new(client),
        }
    }

    pub fn vector_searcher(&self) -> &VectorSearcher {
        &self.vector
    }

    pub fn keyword_searcher(&self) -> &KeywordSearcher {
        &self.keyword
    }

    /// Perform a search per `request.config.mode`.
    ///
    /// The vector path needs a query vector and the keyword path a non-blank
    /// query. A failing path contributes no results; the search only fails
    /// when every attempted path failed. Vector and keyword modes return that
    /// path's list as is; hybrid mode fuses and keeps `final_top_k`.
    pub async fn search(&self, request: &HybridQuery) -> Result<Vec<SearchResult>, StoreError> {
        let config = &request.config;

        let vector_query = request
            .vector
            .as_deref()
            .filter(|_| config.mode != SearchMode::Keyword && config.vector_search.enabled)
            .map(|vector| VectorQuery {
                collection: &request.collection,
                vector,
                k: config.vector_search.top_k,
                filter: request.filter.as_ref(),
                metric: config.vector_search.metric,
                ef: Some(config.vector_search.ef),
            });

        let keyword_query = Some(request.query.as_str())
            .filter(|q| !q.trim().is_empty())
            .filter(|_| config.mode != SearchMode::Vector && config.keyword_search.enabled)
            .map(|query| KeywordQuery {
                collection: &request.collection,
                query,
                k: config.keyword_search.top_k,
                filter: request.filter.as_ref(),
                match_type: config.keyword_search.match_type,
                boost_factor: config.keyword_search.boost_factor,
            });

        info!(
            "Searching {} (mode={}, vector={}, keyword={})",
            request.collection,
            config.mode,
            vector_query.is_some(),
            keyword_query.is_some()
        );

        let (vector_result, keyword_result) = tokio::join!(
            async {
                match &vector_query {
                    Some(q) => Some(self.vector.search(q).await),
                    None => None,
                }
            },
            async {
                match &keyword_query {
                    Some(q) => Some(self.keyword.search(q).await),
                    None => None,
                }
            }
        );

        let vector = PathOutcome::from_result("Vector", vector_result);
        let keyword = PathOutcome::from_result("Keyword", keyword_result);

        let attempted = [&vector, &keyword].iter().filter(|p| p.attempted()).count();
        let failures: Vec<String> = [&vector, &keyword]
            .iter()
            .filter_map(|p| p.error().map(|e| e.to_string()))
            .collect();
        if attempted > 0 && failures.len() == attempted {
            return Err(StoreError::Unavailable(failures.join("; ")));
        }

        let vector = vector.into_results();
        let keyword = keyword.into_results();

        let results = match config.mode {
            SearchMode::Vector => vector,
            SearchMode::Keyword => keyword,
            SearchMode::Hybrid => fuse(vector, keyword, config),
        };

        info!("Search in {} returned {} results", request.collection, results.len());
        Ok(results)
    }
}
