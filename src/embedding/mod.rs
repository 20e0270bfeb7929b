/// Embedding generation and ingestion
///
/// - EmbeddingProvider trait for abstraction over the model
/// - FastEmbedProvider for local embedding
/// - IngestPipeline to embed texts in batches and upsert them into a collection
mod ingest;
mod provider;

pub use ingest::{IngestItem, IngestPipeline, IngestReport, DEFAULT_BATCH_SIZE};
pub use provider::{
    is_supported_model, EmbeddingError, EmbeddingProvider, FastEmbedProvider, SUPPORTED_MODELS,
};
