//! Search results and retrieval configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::store::{FilterExpr, Hit, Metric};

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Vector,
    Keyword,
    Hybrid,
}

/// A ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub source: ResultSource,
    pub original_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

/// Parse stored metadata; empty or malformed metadata becomes `None`
pub fn parse_meta(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

impl SearchResult {
    /// Wrap a raw store hit, keeping its native score
    pub fn from_hit(hit: Hit) -> Self {
        Self {
            meta: parse_meta(&hit.meta),
            id: hit.id,
            score: hit.score,
            text: hit.text,
            source: ResultSource::Vector,
            original_score: hit.score,
            vector_score: Some(hit.score),
            keyword_score: None,
            highlights: Vec::new(),
        }
    }

    /// Text preview truncated to `max_chars` characters
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let cut: String = self.text.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Vector,
    Keyword,
    #[default]
    Hybrid,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Vector => write!(f, "vector"),
            SearchMode::Keyword => write!(f, "keyword"),
            SearchMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(SearchMode::Vector),
            "keyword" => Ok(SearchMode::Keyword),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!("unknown search mode '{}'", other)),
        }
    }
}

/// How keyword candidates are selected: `exact` whole-text equality, `phrase`
/// substring of the full query, `contains`/`fuzzy` any query term as substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Phrase,
    #[default]
    Contains,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchOptions {
    pub enabled: bool,
    pub top_k: usize,
    pub metric: Metric,
    pub ef: usize,
}

impl Default for VectorSearchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 10,
            metric: Metric::Cosine,
            ef: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSearchOptions {
    pub enabled: bool,
    pub top_k: usize,
    pub match_type: MatchType,
    pub boost_factor: f32,
}

impl Default for KeywordSearchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 10,
            match_type: MatchType::Contains,
            boost_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub vector_weight: f32,
    pub keyword_weight: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            keyword_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankFusionParams {
    /// RRF K constant
    pub k: f32,
}

impl Default for RankFusionParams {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

/// How vector and keyword lists are combined in hybrid mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FusionMethod {
    WeightedSum {
        #[serde(default)]
        weights: FusionWeights,
    },
    RankFusion,
    ReciprocalRankFusion {
        #[serde(default)]
        rank_fusion: RankFusionParams,
    },
    /// Both lists concatenated with their own sources and raw scores
    #[serde(rename = "none")]
    Concatenate,
}

impl Default for FusionMethod {
    fn default() -> Self {
        FusionMethod::WeightedSum {
            weights: FusionWeights::default(),
        }
    }
}

impl FromStr for FusionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "weighted_sum" | "weighted" => Ok(FusionMethod::default()),
            "rank_fusion" | "rank" => Ok(FusionMethod::RankFusion),
            "reciprocal_rank_fusion" | "rrf" => Ok(FusionMethod::ReciprocalRankFusion {
                rank_fusion: RankFusionParams::default(),
            }),
            "none" | "concatenate" => Ok(FusionMethod::Concatenate),
            other => Err(format!("unknown fusion method '{}'", other)),
        }
    }
}

/// Full configuration of a hybrid search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchConfig {
    pub mode: SearchMode,
    pub vector_search: VectorSearchOptions,
    pub keyword_search: KeywordSearchOptions,
    /// `None` (or `method = "none"` in a config file) concatenates both lists
    /// and sorts by raw score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_strategy: Option<FusionMethod>,
    pub final_top_k: usize,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            vector_search: VectorSearchOptions::default(),
            keyword_search: KeywordSearchOptions::default(),
            fusion_strategy: Some(FusionMethod::default()),
            final_top_k: 10,
        }
    }
}

/// Parameters of a vector-only search
#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
    pub collection: &'a str,
    pub vector: &'a [f32],
    pub k: usize,
    pub filter: Option<&'a FilterExpr>,
    pub metric: Metric,
    /// Defaults to 128
    pub ef: Option<usize>,
}

/// Parameters of a keyword-only search
#[derive(Debug, Clone)]
pub struct KeywordQuery<'a> {
    pub collection: &'a str,
    pub query: &'a str,
    pub k: usize,
    pub filter: Option<&'a FilterExpr>,
    pub match_type: MatchType,
    pub boost_factor: f32,
}

/// A hybrid search request
#[derive(Debug, Clone)]
pub struct HybridQuery {
    pub collection: String,
    pub query: String,
    /// Query embedding; the vector path is skipped without it
    pub vector: Option<Vec<f32>>,
    pub config: HybridSearchConfig,
    pub filter: Option<FilterExpr>,
}

impl HybridQuery {
    pub fn new(collection: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            query: query.into(),
            vector: None,
            config: HybridSearchConfig::default(),
            filter: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_config(mut self, config: HybridSearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}
