//! Fusion of vector and keyword result lists
//!
//! Results are merged by id. A result present in only one list contributes
//! only that list's term. Ties keep insertion order: vector results first,
//! then keyword-only results.

use std::collections::HashMap;

use crate::store::Metric;

use super::normalize::normalize_scores;
use super::types::{FusionMethod, FusionWeights, HybridSearchConfig, ResultSource, SearchResult};

/// Fused list keyed by id, in insertion order
#[derive(Default)]
struct Fused {
    results: Vec<SearchResult>,
    positions: HashMap<String, usize>,
}

impl Fused {
    fn get_mut(&mut self, id: &str) -> Option<&mut SearchResult> {
        self.positions.get(id).map(|&pos| &mut self.results[pos])
    }

    fn push(&mut self, result: SearchResult) {
        self.positions.insert(result.id.clone(), self.results.len());
        self.results.push(result);
    }

    /// Add a vector result; a repeated id keeps its first (best) rank
    fn add_vector(&mut self, result: SearchResult, contribution: f32, vector_score: f32) {
        if self.positions.contains_key(&result.id) {
            return;
        }
        self.push(SearchResult {
            score: contribution,
            source: ResultSource::Hybrid,
            original_score: contribution,
            vector_score: Some(vector_score),
            keyword_score: None,
            ..result
        });
    }

    fn add_keyword(&mut self, result: SearchResult, contribution: f32, keyword_score: f32) {
        match self.get_mut(&result.id) {
            Some(existing) => {
                if existing.keyword_score.is_some() {
                    return;
                }
                existing.score += contribution;
                existing.original_score = existing.score;
                existing.keyword_score = Some(keyword_score);
                existing.highlights = result.highlights;
            }
            None => self.push(SearchResult {
                score: contribution,
                source: ResultSource::Hybrid,
                original_score: contribution,
                vector_score: None,
                keyword_score: Some(keyword_score),
                ..result
            }),
        }
    }
}

/// `score = w_v · norm(vector) + w_k · norm(keyword)`
///
/// Distances (`vector_metric` where lower is better) are negated before
/// normalization so the nearest neighbour still normalizes to 1.
pub fn weighted_sum(
    vector: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    weights: &FusionWeights,
    vector_metric: Metric,
) -> Vec<SearchResult> {
    let mut fused = Fused::default();

    let vector = if vector_metric.higher_is_better() {
        vector
    } else {
        vector
            .into_iter()
            .map(|r| SearchResult {
                score: -r.score,
                ..r
            })
            .collect()
    };

    for result in normalize_scores(vector) {
        let normalized = result.score;
        fused.add_vector(result, weights.vector_weight * normalized, normalized);
    }
    for result in normalize_scores(keyword) {
        let normalized = result.score;
        fused.add_keyword(result, weights.keyword_weight * normalized, normalized);
    }

    fused.results
}

/// Rank-based fusion: each list contributes `rank_weight(rank)` with 1-based ranks.
/// Raw scores are kept as `vector_score` / `keyword_score`.
pub fn rank_fusion(
    vector: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    rank_weight: impl Fn(f32) -> f32,
) -> Vec<SearchResult> {
    let mut fused = Fused::default();

    for (rank, result) in vector.into_iter().enumerate() {
        let raw = result.score;
        fused.add_vector(result, rank_weight(rank as f32 + 1.0), raw);
    }
    for (rank, result) in keyword.into_iter().enumerate() {
        let raw = result.score;
        fused.add_keyword(result, rank_weight(rank as f32 + 1.0), raw);
    }

    fused.results
}

/// Concatenate both lists, tagged with their source, without deduplication
pub fn naive_merge(vector: Vec<SearchResult>, keyword: Vec<SearchResult>) -> Vec<SearchResult> {
    let vector = vector.into_iter().map(|r| SearchResult {
        source: ResultSource::Vector,
        vector_score: Some(r.score),
        ..r
    });
    let keyword = keyword.into_iter().map(|r| SearchResult {
        source: ResultSource::Keyword,
        keyword_score: Some(r.score),
        ..r
    });
    vector.chain(keyword).collect()
}

/// Fuse per `config.fusion_strategy`, sort by score and keep `final_top_k`
pub fn fuse(
    vector: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    config: &HybridSearchConfig,
) -> Vec<SearchResult> {
    let mut results = match &config.fusion_strategy {
        None | Some(FusionMethod::Concatenate) => naive_merge(vector, keyword),
        Some(FusionMethod::WeightedSum { weights }) => {
            weighted_sum(vector, keyword, weights, config.vector_search.metric)
        }
        Some(FusionMethod::RankFusion) => rank_fusion(vector, keyword, |rank| 1.0 / rank),
        Some(FusionMethod::ReciprocalRankFusion { rank_fusion: params }) => {
            let k = params.k;
            rank_fusion(vector, keyword, move |rank| 1.0 / (k + rank))
        }
    };

    // Stable sort keeps insertion order for ties
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(config.final_top_k);
    results
}
