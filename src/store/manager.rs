//! Collection lifecycle and validated upserts
//!
//! [`CollectionManager`] makes sure a collection exists with the right shape
//! before anything is written, rebuilds it when the embedding dimension
//! changes, and waits for written rows to become visible.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::VectorStoreClient;
use super::schema::{CollectionSchema, IndexParams, Metric, Row, ID_MAX_LEN, META_MAX_LEN, TEXT_MAX_LEN};
use super::StoreError;

/// Index and persistence parameters used when creating and writing collections
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub default_metric: Metric,
    pub persist_poll_interval: Duration,
    pub persist_max_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            default_metric: Metric::Cosine,
            persist_poll_interval: Duration::from_millis(500),
            persist_max_attempts: 20,
        }
    }
}

/// A point to upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub meta: Value,
}

impl VectorPoint {
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
            meta: Value::Null,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    fn is_valid(&self, dim: usize) -> bool {
        !self.id.is_empty()
            && self.id.chars().count() <= ID_MAX_LEN
            && !self.vector.is_empty()
            && self.vector.len() == dim
            && self.vector.iter().all(|v| v.is_finite())
    }

    fn into_row(self) -> Row {
        let text = if self.text.chars().count() > TEXT_MAX_LEN {
            self.text.chars().take(TEXT_MAX_LEN).collect()
        } else {
            self.text
        };

        let meta = match self.meta {
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        let meta = if meta.len() > META_MAX_LEN {
            r#"{"truncated":true}"#.to_string()
        } else {
            meta
        };

        Row {
            id: self.id,
            text,
            vector: self.vector,
            meta,
        }
    }
}

/// Outcome of an upsert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub written: usize,
    /// Row count last observed after the flush
    pub row_count: u64,
}

/// What [`CollectionManager::reconcile_schema`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaReconciliation {
    Unchanged,
    Created,
    Rebuilt { reason: String },
}

pub struct CollectionManager {
    client: Arc<dyn VectorStoreClient>,
    settings: StoreSettings,
}

impl CollectionManager {
    pub fn new(client: Arc<dyn VectorStoreClient>, settings: StoreSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Create, index and load `name` for `dim`-dimensional vectors.
    ///
    /// An existing collection whose schema cannot hold `dim` is dropped and
    /// recreated. An already-present index is not an error.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), StoreError> {
        self.reconcile_schema(name, dim).await?;
        self.build_index(name, metric).await?;
        self.client.load_collection(name).await?;
        debug!("Collection {} ready (dim={}, metric={})", name, dim, metric);
        Ok(())
    }

    /// Make the stored schema match `dim`, recreating the collection if needed
    pub async fn reconcile_schema(
        &self,
        name: &str,
        dim: usize,
    ) -> Result<SchemaReconciliation, StoreError> {
        if !self.client.has_collection(name).await? {
            info!("Creating collection {} (dim={})", name, dim);
            self.client
                .create_collection(name, CollectionSchema::standard(dim))
                .await?;
            return Ok(SchemaReconciliation::Created);
        }

        let schema = self.client.describe_collection(name).await?;
        let Some(reason) = schema.incompatibility(dim) else {
            return Ok(SchemaReconciliation::Unchanged);
        };

        warn!("Collection {} is incompatible ({}), recreating", name, reason);
        if let Err(e) = self.client.release_collection(name).await {
            debug!("Release before drop failed: {}", e);
        }
        self.client.drop_collection(name).await?;
        self.client
            .create_collection(name, CollectionSchema::standard(dim))
            .await?;

        Ok(SchemaReconciliation::Rebuilt { reason })
    }

    async fn build_index(&self, name: &str, metric: Metric) -> Result<(), StoreError> {
        let params = IndexParams::hnsw(
            metric,
            self.settings.hnsw_m,
            self.settings.hnsw_ef_construction,
        );
        match self.client.create_index(name, params).await {
            Ok(()) => {
                info!("Created HNSW index on {} ({})", name, metric);
                Ok(())
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!("Index on {} already exists", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate and upsert `points`, then flush and wait for persistence.
    ///
    /// The batch dimension is taken from the first non-empty vector. Any
    /// invalid point rejects the whole batch before the store is touched. A
    /// schema error on insert triggers one drop-recreate-retry.
    pub async fn upsert_vectors(
        &self,
        name: &str,
        points: Vec<VectorPoint>,
    ) -> Result<UpsertReport, StoreError> {
        if points.is_empty() {
            return Ok(UpsertReport::default());
        }

        let dim = points
            .iter()
            .map(|p| p.vector.len())
            .find(|&d| d > 0)
            .unwrap_or(0);
        let invalid = points.iter().filter(|p| !p.is_valid(dim)).count();
        if invalid > 0 {
            warn!("Rejecting batch for {}: {} of {} points invalid", name, invalid, points.len());
            return Err(StoreError::InvalidPoints {
                invalid,
                total: points.len(),
            });
        }

        let metric = self.settings.default_metric;
        self.ensure_collection(name, dim, metric).await?;

        let distinct = points.iter().map(|p| p.id.as_str()).collect::<HashSet<_>>().len() as u64;
        let rows: Vec<Row> = points.into_iter().map(VectorPoint::into_row).collect();

        let written = match self.client.insert(name, rows.clone()).await {
            Ok(n) => n,
            Err(e) if e.is_schema_error() => {
                warn!("Insert into {} failed ({}), recreating collection", name, e);
                self.client.drop_collection(name).await?;
                self.ensure_collection(name, dim, metric).await?;
                self.client.insert(name, rows).await?
            }
            Err(e) => return Err(e),
        };

        self.client.flush(name).await?;
        let row_count = self.wait_for_rows(name, distinct).await?;

        info!("Upserted {} points into {} ({} rows)", written, name, row_count);
        Ok(UpsertReport { written, row_count })
    }

    /// Poll the row count until it reaches `target` or attempts run out.
    /// Observed progress extends the remaining attempts to at least five.
    async fn wait_for_rows(&self, name: &str, target: u64) -> Result<u64, StoreError> {
        let mut remaining = self.settings.persist_max_attempts.max(1);
        let mut last = 0u64;

        while remaining > 0 {
            match self.client.row_count(name).await {
                Ok(count) if count >= target => return Ok(count),
                Ok(count) => {
                    debug!("{} rows visible in {}, waiting for {}", count, name, target);
                    if count > last {
                        last = count;
                        remaining = remaining.max(5);
                    }
                }
                Err(e) => debug!("Row count check failed: {}", e),
            }
            remaining -= 1;
            if remaining > 0 {
                tokio::time::sleep(self.settings.persist_poll_interval).await;
            }
        }

        let count = self.client.row_count(name).await?;
        if count == 0 {
            warn!("No rows visible in {} after flush", name);
        } else {
            warn!("Only {} of {} rows visible in {} after flush", count, target, name);
        }
        Ok(count)
    }
}
