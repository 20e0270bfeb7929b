//! Keyword search with BM25-style scoring
//!
//! The store only offers scalar filtering, so candidates are fetched with a
//! filter built from the match type and ranked here. Corpus
//! statistics are not available, so IDF uses an assumed corpus of 1000
//! documents and an assumed average length of 100 tokens.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::{FilterExpr, FilterField, Record, StoreError, VectorStoreClient};
use crate::text::{query_terms, tokenize};

use super::types::{parse_meta, KeywordQuery, MatchType, ResultSource, SearchResult};

const K1: f32 = 1.5;
const B: f32 = 0.75;
const ASSUMED_CORPUS_SIZE: f32 = 1000.0;
const ASSUMED_AVG_DOC_LEN: f32 = 100.0;

/// Candidates fetched per requested result
const CANDIDATE_MULTIPLIER: usize = 5;
/// Upper bound on `k`
pub const MAX_K: usize = 200;

/// BM25 score of `text` for the (already distinct) query terms, times `boost`
pub fn bm25_score(terms: &[String], text: &str, boost: f32) -> f32 {
    let tokens = tokenize(text);
    let doc_len = tokens.len() as f32;

    let score: f32 = terms
        .iter()
        .map(|term| {
            let tf = tokens.iter().filter(|t| *t == term).count() as f32;
            if tf == 0.0 {
                return 0.0;
            }
            let idf = (ASSUMED_CORPUS_SIZE / (1.0 + tf)).ln();
            let norm = K1 * (1.0 - B + B * doc_len / ASSUMED_AVG_DOC_LEN);
            idf * (tf * (K1 + 1.0)) / (tf + norm)
        })
        .sum();

    score * boost
}

/// Case-insensitive matcher for highlight extraction
pub struct Highlighter {
    patterns: Vec<Regex>,
}

impl Highlighter {
    pub fn new(terms: &[String]) -> Self {
        let patterns = terms
            .iter()
            .filter_map(|t| {
                RegexBuilder::new(&regex::escape(t))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        Self { patterns }
    }

    /// Distinct lower-cased matches in first-seen order
    pub fn highlights(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.patterns
            .iter()
            .flat_map(|re| re.find_iter(text))
            .map(|m| m.as_str().to_lowercase())
            .filter(|m| seen.insert(m.clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct KeywordSearcher {
    client: Arc<dyn VectorStoreClient>,
}

impl KeywordSearcher {
    pub fn new(client: Arc<dyn VectorStoreClient>) -> Self {
        Self { client }
    }

    /// Rank stored texts against `query.query`.
    ///
    /// Returns an empty list for a blank query, a query without terms or a
    /// missing collection. Zero-score candidates are dropped.
    pub async fn search(&self, query: &KeywordQuery<'_>) -> Result<Vec<SearchResult>, StoreError> {
        let terms = query_terms(query.query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        if !self.client.has_collection(query.collection).await? {
            info!("Collection {} does not exist, no keyword results", query.collection);
            return Ok(Vec::new());
        }
        if let Err(e) = self.client.load_collection(query.collection).await {
            warn!("Loading {} before keyword search failed: {}", query.collection, e);
        }

        let k = query.k.clamp(1, MAX_K);
        let filter = self.candidate_filter(&terms, query);
        let candidates = self
            .client
            .query(query.collection, &filter, k * CANDIDATE_MULTIPLIER)
            .await?;
        debug!("{} keyword candidates for {} terms", candidates.len(), terms.len());

        let highlighter = Highlighter::new(&terms);
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|record| self.score(record, &terms, &highlighter, query.boost_factor))
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    fn candidate_filter(&self, terms: &[String], query: &KeywordQuery<'_>) -> FilterExpr {
        let text_filter = match query.match_type {
            MatchType::Exact => FilterExpr::eq(FilterField::Text, query.query),
            MatchType::Phrase => FilterExpr::contains(FilterField::Text, query.query.trim()),
            MatchType::Contains | MatchType::Fuzzy => FilterExpr::any_of(
                terms
                    .iter()
                    .map(|t| FilterExpr::contains(FilterField::Text, t.clone()))
                    .collect(),
            ),
        };

        match query.filter {
            Some(extra) => text_filter.and(extra.clone()),
            None => text_filter,
        }
    }

    fn score(
        &self,
        record: Record,
        terms: &[String],
        highlighter: &Highlighter,
        boost: f32,
    ) -> Option<SearchResult> {
        let score = bm25_score(terms, &record.text, boost);
        if score <= 0.0 {
            return None;
        }

        Some(SearchResult {
            highlights: highlighter.highlights(&record.text),
            meta: parse_meta(&record.meta),
            id: record.id,
            score,
            text: record.text,
            source: ResultSource::Keyword,
            original_score: score,
            vector_score: None,
            keyword_score: Some(score),
        })
    }
}
