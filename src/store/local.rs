//! In-process vector store backed by HNSW graphs
use async_trait::async_trait;
use hnsw_rs::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::client::{AnnRequest, VectorStoreClient};
use super::filter::FilterExpr;
use super::schema::{has_finite_norm, CollectionSchema, Hit, IndexParams, Metric, Record, Row};
use super::StoreError;

/// Max HNSW layers
const MAX_LAYERS: usize = 16;

/// HNSW graph for the metrics hnsw_rs can index directly
enum AnnGraph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    L2(Hnsw<'static, f32, DistL2>),
}

impl AnnGraph {
    /// Build a graph over `rows`; `None` for metrics served by exact scan
    /// and for rows the distance kernels cannot handle.
    fn build(params: &IndexParams, rows: &[Row]) -> Option<Self> {
        if let Some(row) = rows.iter().find(|r| !has_finite_norm(&r.vector)) {
            warn!(
                "Vector {} overflows f32 distance math, serving collection by exact scan",
                row.id
            );
            return None;
        }

        let max_elements = rows.len().max(1);
        let graph = match params.metric {
            Metric::Cosine => AnnGraph::Cosine(Hnsw::new(
                params.m,
                max_elements,
                MAX_LAYERS,
                params.ef_construction,
                DistCosine,
            )),
            Metric::L2 => AnnGraph::L2(Hnsw::new(
                params.m,
                max_elements,
                MAX_LAYERS,
                params.ef_construction,
                DistL2,
            )),
            Metric::Ip => return None,
        };

        for (idx, row) in rows.iter().enumerate() {
            match &graph {
                AnnGraph::Cosine(g) => g.insert((row.vector.as_slice(), idx)),
                AnnGraph::L2(g) => g.insert((row.vector.as_slice(), idx)),
            }
        }

        Some(graph)
    }

    fn metric(&self) -> Metric {
        match self {
            AnnGraph::Cosine(_) => Metric::Cosine,
            AnnGraph::L2(_) => Metric::L2,
        }
    }

    /// Row positions of the approximate nearest neighbours
    fn neighbours(&self, query: &[f32], k: usize, ef: usize) -> Vec<usize> {
        let found = match self {
            AnnGraph::Cosine(g) => g.search(query, k, ef.max(k)),
            AnnGraph::L2(g) => g.search(query, k, ef.max(k)),
        };
        found.into_iter().map(|n| n.d_id).collect()
    }
}

struct LocalCollection {
    schema: CollectionSchema,
    dim: usize,
    rows: Vec<Row>,
    positions: HashMap<String, usize>,
    index: Option<IndexParams>,
    graph: Option<AnnGraph>,
    /// Rows changed since the graph was last built
    stale: bool,
    loaded: bool,
    persisted: u64,
}

impl LocalCollection {
    fn refresh(&mut self) {
        if self.stale {
            self.graph = self
                .index
                .as_ref()
                .and_then(|params| AnnGraph::build(params, &self.rows));
            self.stale = false;
            debug!("Rebuilt graph over {} rows", self.rows.len());
        }
        self.persisted = self.rows.len() as u64;
    }

    fn exact(&self, request: &AnnRequest) -> Vec<(usize, f32)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(&row.id, &row.text, &row.meta))
            })
            .map(|(idx, row)| (idx, request.metric.score(&request.vector, &row.vector)))
            .collect()
    }
}

fn best_first(metric: Metric) -> impl Fn(&(usize, f32), &(usize, f32)) -> Ordering {
    move |a, b| {
        if metric.higher_is_better() {
            b.1.total_cmp(&a.1)
        } else {
            a.1.total_cmp(&b.1)
        }
    }
}

/// Vector store kept entirely in memory.
///
/// Rows are upserted by id. A collection with an HNSW index answers unfiltered
/// COSINE/L2 searches from the graph once it has been flushed or loaded; IP,
/// filtered searches and rows not yet flushed use an exact scan. Every
/// candidate is re-scored exactly, so returned scores are the metric's native
/// values.
#[derive(Default)]
pub struct LocalVectorStore {
    collections: RwLock<HashMap<String, LocalCollection>>,
}

impl LocalVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(name: &str) -> StoreError {
    StoreError::CollectionNotFound(name.to_string())
}

#[async_trait]
impl VectorStoreClient for LocalVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionSchema, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(name).ok_or_else(|| not_found(name))?;
        Ok(coll.schema.clone())
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(StoreError::AlreadyExists(format!("collection {}", name)));
        }
        let dim = schema
            .vector_dim()
            .ok_or_else(|| StoreError::SchemaIncompatible {
                collection: name.to_string(),
                reason: "no vector field".to_string(),
            })?;

        collections.insert(
            name.to_string(),
            LocalCollection {
                schema,
                dim,
                rows: Vec::new(),
                positions: HashMap::new(),
                index: None,
                graph: None,
                stale: false,
                loaded: false,
                persisted: 0,
            },
        );
        debug!("Created collection {} (dim={})", name, dim);
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn release_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(name).ok_or_else(|| not_found(name))?;
        coll.loaded = false;
        Ok(())
    }

    async fn create_index(&self, name: &str, params: IndexParams) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(name).ok_or_else(|| not_found(name))?;
        if coll.index.is_some() {
            return Err(StoreError::AlreadyExists(format!("index on {}", name)));
        }
        if let Some(reason) = params.problem() {
            return Err(StoreError::InvalidIndex {
                collection: name.to_string(),
                reason,
            });
        }
        coll.index = Some(params);
        coll.stale = true;
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(name).ok_or_else(|| not_found(name))?;
        coll.refresh();
        coll.loaded = true;
        Ok(())
    }

    async fn insert(&self, name: &str, rows: Vec<Row>) -> Result<usize, StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(name).ok_or_else(|| not_found(name))?;

        if let Some(bad) = rows.iter().find(|r| r.vector.len() != coll.dim) {
            return Err(StoreError::DimensionMismatch {
                expected: coll.dim,
                actual: bad.vector.len(),
            });
        }

        let written = rows.len();
        for row in rows {
            match coll.positions.get(&row.id) {
                Some(&pos) => coll.rows[pos] = row,
                None => {
                    coll.positions.insert(row.id.clone(), coll.rows.len());
                    coll.rows.push(row);
                }
            }
        }
        coll.stale = true;
        Ok(written)
    }

    async fn flush(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(name).ok_or_else(|| not_found(name))?;
        coll.refresh();
        Ok(())
    }

    async fn row_count(&self, name: &str) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(name).ok_or_else(|| not_found(name))?;
        Ok(coll.persisted)
    }

    async fn search(&self, name: &str, request: AnnRequest) -> Result<Vec<Hit>, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(name).ok_or_else(|| not_found(name))?;

        if !coll.loaded {
            return Err(StoreError::NotLoaded(name.to_string()));
        }
        if request.vector.len() != coll.dim {
            return Err(StoreError::DimensionMismatch {
                expected: coll.dim,
                actual: request.vector.len(),
            });
        }

        let limit = request.limit.max(1);
        let mut scored: Vec<(usize, f32)> = match &coll.graph {
            Some(graph)
                if !coll.stale && request.filter.is_none() && graph.metric() == request.metric =>
            {
                graph
                    .neighbours(&request.vector, limit, request.ef)
                    .into_iter()
                    .filter_map(|idx| coll.rows.get(idx).map(|row| (idx, row)))
                    .map(|(idx, row)| (idx, request.metric.score(&request.vector, &row.vector)))
                    .collect()
            }
            _ => coll.exact(&request),
        };

        scored.sort_by(best_first(request.metric));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| {
                let row = &coll.rows[idx];
                Hit {
                    id: row.id.clone(),
                    score,
                    text: row.text.clone(),
                    meta: row.meta.clone(),
                }
            })
            .collect())
    }

    async fn query(
        &self,
        name: &str,
        filter: &FilterExpr,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        let coll = collections.get(name).ok_or_else(|| not_found(name))?;

        Ok(coll
            .rows
            .iter()
            .filter(|row| filter.matches(&row.id, &row.text, &row.meta))
            .take(limit)
            .map(|row| Record {
                id: row.id.clone(),
                text: row.text.clone(),
                meta: row.meta.clone(),
            })
            .collect())
    }
}
