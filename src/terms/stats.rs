//! Occurrence statistics gathered over chunks and over the whole document

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use crate::text::{tokenize, tokenize_full};

use super::pmi::{bigram_pmi, trigram_pmi};

/// What is known about one surface form (token or n-gram)
#[derive(Debug, Default)]
pub(crate) struct Occurrence {
    pub freq: u32,
    pub chunks: HashSet<usize>,
    pub left: HashSet<String>,
    pub right: HashSet<String>,
}

impl Occurrence {
    fn observe(&mut self, left: Option<&String>, right: Option<&String>) {
        self.freq += 1;
        if let Some(l) = left {
            self.left.insert(l.clone());
        }
        if let Some(r) = right {
            self.right.insert(r.clone());
        }
    }

    pub fn diversity(&self) -> f64 {
        (1.0 + self.left.len() as f64 + self.right.len() as f64).ln()
    }
}

/// Statistics for one extraction call.
///
/// Token frequency, coverage and neighbours come from the per-chunk pass (so
/// overlapping windows count twice, as the chunking intends). N-gram counts
/// and the unigram totals used for PMI come from a single pass over the whole
/// document, which keeps an n-gram cut by a window edge from being lost.
pub(crate) struct DocumentStats {
    pub total_chunks: usize,
    pub tokens: HashMap<String, Occurrence>,
    pub ngrams: HashMap<String, Occurrence>,
    unigram_counts: HashMap<String, u32>,
    total_unigrams: u64,
}

fn join(parts: &[String]) -> String {
    parts.join(" ")
}

impl DocumentStats {
    pub fn collect(document: &str, chunks: &[&str]) -> Self {
        let mut tokens: HashMap<String, Occurrence> = HashMap::new();
        let mut chunk_ngrams: Vec<HashSet<String>> = Vec::with_capacity(chunks.len());

        for (idx, chunk) in chunks.iter().enumerate() {
            let toks = tokenize(chunk);
            let mut present = HashSet::new();

            for i in 0..toks.len() {
                let left = i.checked_sub(1).map(|j| &toks[j]);
                let occ = tokens.entry(toks[i].clone()).or_default();
                occ.observe(left, toks.get(i + 1));
                occ.chunks.insert(idx);

                for n in [2usize, 3] {
                    if i + n <= toks.len() {
                        present.insert(join(&toks[i..i + n]));
                    }
                }
            }
            chunk_ngrams.push(present);
        }

        let doc_tokens = tokenize_full(document);
        let mut unigram_counts: HashMap<String, u32> = HashMap::new();
        let mut ngrams: HashMap<String, Occurrence> = HashMap::new();

        for i in 0..doc_tokens.len() {
            *unigram_counts.entry(doc_tokens[i].clone()).or_insert(0) += 1;

            let left = i.checked_sub(1).map(|j| &doc_tokens[j]);
            for n in [2usize, 3] {
                if i + n <= doc_tokens.len() {
                    ngrams
                        .entry(join(&doc_tokens[i..i + n]))
                        .or_default()
                        .observe(left, doc_tokens.get(i + n));
                }
            }
        }

        for (idx, present) in chunk_ngrams.iter().enumerate() {
            for key in present {
                if let Some(occ) = ngrams.get_mut(key) {
                    occ.chunks.insert(idx);
                }
            }
        }

        Self {
            total_chunks: chunks.len().max(1),
            tokens,
            ngrams,
            total_unigrams: doc_tokens.len() as u64,
            unigram_counts,
        }
    }

    /// Unigram count, defaulting to 1 for unseen words
    fn unigram(&self, word: &str) -> u32 {
        self.unigram_counts.get(word).copied().unwrap_or(1)
    }

    /// N-gram count, defaulting to 1 for unseen n-grams
    fn ngram(&self, key: &str) -> u32 {
        self.ngrams.get(key).map(|o| o.freq).unwrap_or(1)
    }

    /// PMI of a space-joined bigram or trigram; 0 for anything else
    pub fn pmi(&self, ngram: &str) -> f64 {
        let parts: Vec<&str> = ngram.split(' ').collect();
        let joint = self.ngrams.get(ngram).map(|o| o.freq).unwrap_or(0);

        match parts.as_slice() {
            [w1, w2] => bigram_pmi(joint, self.unigram(w1), self.unigram(w2), self.total_unigrams),
            [w1, w2, w3] => trigram_pmi(
                joint,
                self.ngram(&format!("{} {}", w1, w2)),
                self.ngram(&format!("{} {}", w2, w3)),
                self.unigram(w1),
                self.unigram(w2),
                self.unigram(w3),
                self.total_unigrams,
            ),
            _ => 0.0,
        }
    }
}
