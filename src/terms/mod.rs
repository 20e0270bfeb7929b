//! Statistical term candidate extraction
//!
//! Mines a document for likely domain terms (words, CJK bigrams and
//! recurring 2/3-grams) so callers can look them up in dictionaries and
//! translation memories. The ranking is purely derived from the input text:
//! the same text and options always produce the same list.

mod pmi;
mod stats;

pub use pmi::{bigram_pmi, trigram_pmi};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::text::{contains_cjk, split_chunks};
use stats::{DocumentStats, Occurrence};

/// Coverage above which a single token is too common to be a term
const MAX_TOKEN_COVERAGE: f64 = 0.8;
/// Minimum length of a non-CJK single-token candidate
const MIN_LATIN_LEN: usize = 3;
/// Minimum frequency of a bigram/trigram candidate
const MIN_NGRAM_FREQ: u32 = 2;

const W_TFIDF: f64 = 0.5;
const W_PMI: f64 = 0.3;
const W_DIVERSITY: f64 = 0.2;
const W_LENGTH: f64 = 0.1;

/// A ranked term candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTerm {
    pub term: String,
    pub count: u32,
    pub score: f64,
}

/// Chunking and truncation parameters for an extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermExtractionOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_candidates: usize,
}

impl Default for TermExtractionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 80,
            max_candidates: 100,
        }
    }
}

fn tfidf(freq: u32, df: usize, total_chunks: usize) -> f64 {
    let df = df.max(1) as f64;
    let idf = ((total_chunks as f64 + 1.0) / (df + 0.5)).ln() + 1.0;
    freq as f64 * idf
}

fn score(stats: &DocumentStats, occ: &Occurrence, pmi: f64, units: usize) -> f64 {
    let length_boost = (units as f64 + 1.0).log2();
    W_TFIDF * tfidf(occ.freq, occ.chunks.len(), stats.total_chunks)
        + W_PMI * pmi.max(0.0)
        + W_DIVERSITY * occ.diversity()
        + W_LENGTH * length_boost
}

fn rank(a: &DocumentTerm, b: &DocumentTerm) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| b.term.chars().count().cmp(&a.term.chars().count()))
        .then_with(|| a.term.cmp(&b.term))
}

/// Extract the top `max_candidates` term candidates from `text`.
///
/// Single tokens are kept unless they appear in more than 80% of the chunks or
/// are non-CJK and shorter than three characters. Bigrams and trigrams need
/// at least two occurrences.
pub fn extract_candidate_terms(text: &str, options: &TermExtractionOptions) -> Vec<DocumentTerm> {
    let chunks = split_chunks(text, options.chunk_size, options.overlap);
    let stats = DocumentStats::collect(text, &chunks);

    let mut candidates: Vec<DocumentTerm> = Vec::new();

    for (token, occ) in &stats.tokens {
        let coverage = occ.chunks.len() as f64 / stats.total_chunks as f64;
        if coverage > MAX_TOKEN_COVERAGE {
            continue;
        }
        if !contains_cjk(token) && token.chars().count() < MIN_LATIN_LEN {
            continue;
        }
        candidates.push(DocumentTerm {
            term: token.clone(),
            count: occ.freq,
            score: score(&stats, occ, 0.0, token.chars().count()),
        });
    }

    for (ngram, occ) in &stats.ngrams {
        if occ.freq < MIN_NGRAM_FREQ {
            continue;
        }
        let units = ngram.split(' ').count();
        candidates.push(DocumentTerm {
            term: ngram.clone(),
            count: occ.freq,
            score: score(&stats, occ, stats.pmi(ngram), units),
        });
    }

    candidates.sort_by(rank);
    candidates.truncate(options.max_candidates.max(1));

    tracing::debug!(
        "Extracted {} term candidates from {} chunks",
        candidates.len(),
        stats.total_chunks
    );

    candidates
}
