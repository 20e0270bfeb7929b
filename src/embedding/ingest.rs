/// Batch ingestion: embed texts and upsert them into a collection
use super::{EmbeddingError, EmbeddingProvider};
use crate::store::{CollectionManager, VectorPoint};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of texts embedded and upserted together
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// A text to ingest. Items without an id get a random UUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestItem {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub meta: Value,
}

impl IngestItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            meta: Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    /// Blank texts and items whose embedding came back empty
    pub skipped: usize,
    /// Items in batches that failed to embed or upsert
    pub failed: usize,
    pub duration_ms: u64,
}

pub struct IngestPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    manager: Arc<CollectionManager>,
    collection: String,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        manager: Arc<CollectionManager>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            manager,
            collection: collection.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and upsert `items` batch by batch.
    ///
    /// A failing batch is logged and counted; later batches still run.
    pub async fn process(&self, items: Vec<IngestItem>) -> Result<IngestReport> {
        let start = std::time::Instant::now();
        let mut report = IngestReport::default();

        let (items, blank): (Vec<IngestItem>, Vec<IngestItem>) =
            items.into_iter().partition(|item| !item.text.trim().is_empty());
        report.skipped += blank.len();

        info!(
            "Ingesting {} items into {} (batch size {})",
            items.len(),
            self.collection,
            self.batch_size
        );

        for chunk in items.chunks(self.batch_size) {
            match self.process_chunk(chunk).await {
                Ok((written, skipped)) => {
                    report.processed += written;
                    report.skipped += skipped;
                    debug!("Ingested batch of {} ({} skipped)", written, skipped);
                }
                Err(e) => {
                    warn!("Failed to ingest batch: {:#}", e);
                    report.failed += chunk.len();
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Ingestion complete: {} processed, {} skipped, {} failed, {}ms",
            report.processed, report.skipped, report.failed, report.duration_ms
        );

        Ok(report)
    }

    /// Returns (written, skipped)
    async fn process_chunk(&self, chunk: &[IngestItem]) -> Result<(usize, usize)> {
        let texts: Vec<String> = chunk.iter().map(|item| item.text.clone()).collect();
        let embeddings = self
            .provider
            .embed_batch(&texts)
            .context("embedding batch")?;

        if embeddings.len() != chunk.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                chunk.len(),
                embeddings.len()
            ))
            .into());
        }

        let mut skipped = 0;
        let points: Vec<VectorPoint> = chunk
            .iter()
            .zip(embeddings)
            .filter_map(|(item, vector)| {
                if vector.is_empty() {
                    skipped += 1;
                    return None;
                }
                let id = item
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                Some(VectorPoint::new(id, item.text.clone(), vector).with_meta(item.meta.clone()))
            })
            .collect();

        let report = self
            .manager
            .upsert_vectors(&self.collection, points)
            .await
            .with_context(|| format!("upserting into {}", self.collection))?;

        Ok((report.written, skipped))
    }
}
