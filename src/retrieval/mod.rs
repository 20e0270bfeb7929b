//! Hybrid retrieval
//!
//! Vector search over the store's HNSW index, BM25-style keyword ranking over
//! substring candidates, and fusion of the two lists.

mod fusion;
mod hybrid;
mod keyword;
mod normalize;
mod types;
mod vector;

pub use fusion::{fuse, naive_merge, rank_fusion, weighted_sum};
pub use hybrid::HybridSearcher;
pub use keyword::{bm25_score, Highlighter, KeywordSearcher, MAX_K};
pub use normalize::{normalize, normalize_scores};
pub use types::{
    parse_meta, FusionMethod, FusionWeights, HybridQuery, HybridSearchConfig,
    KeywordQuery, KeywordSearchOptions, MatchType, RankFusionParams, ResultSource, SearchMode,
    SearchResult, VectorQuery, VectorSearchOptions,
};
pub use vector::{VectorSearcher, DEFAULT_EF};
