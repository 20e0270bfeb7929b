//! Vector collection storage: client seam, local backend and collection lifecycle
pub mod client;
pub mod filter;
pub mod local;
pub mod manager;
pub mod schema;

pub use client::{AnnRequest, VectorStoreClient};
pub use filter::{FilterExpr, FilterField};
pub use local::LocalVectorStore;
pub use manager::{CollectionManager, SchemaReconciliation, StoreSettings, UpsertReport, VectorPoint};
pub use schema::{CollectionSchema, FieldSchema, FieldType, Hit, IndexParams, IndexType, Metric, Record, Row};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Collection not loaded: {0}")]
    NotLoaded(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Incompatible schema for {collection}: {reason}")]
    SchemaIncompatible { collection: String, reason: String },

    #[error("Invalid index parameters for {collection}: {reason}")]
    InvalidIndex { collection: String, reason: String },

    #[error("{invalid} of {total} points are invalid")]
    InvalidPoints { invalid: usize, total: usize },

    #[error("Store request failed: {0}")]
    Rpc(String),
}

impl StoreError {
    /// Errors that a drop-and-recreate of the collection can fix
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            StoreError::DimensionMismatch { .. } | StoreError::SchemaIncompatible { .. }
        )
    }
}
