//! Termweave - term extraction and hybrid retrieval
//!
//! Extracts candidate domain terms from documents with TF-IDF, PMI and
//! context diversity, and searches vector collections with fused ANN and
//! BM25-style keyword ranking. Built for translation memory and terminology
//! lookups over mixed CJK/Latin text.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod retrieval;
pub mod store;
pub mod terms;
pub mod text;

pub use engine::Engine;
pub use error::{Result, TermweaveError};
pub use terms::{extract_candidate_terms, DocumentTerm, TermExtractionOptions};
