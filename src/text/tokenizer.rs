//! Latin word and CJK bigram tokenization
//!
//! Latin words are maximal runs of letters/digits that are not Han characters,
//! lower-cased. Every other character (whitespace, ASCII and CJK punctuation)
//! separates words. Han text has no word boundaries, so it is covered by
//! overlapping two-character grams taken from the whitespace-stripped input.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Number of whitespace-stripped characters scanned for CJK bigrams
pub const CJK_PREFIX_CAP: usize = 2000;

/// Maximum number of distinct terms kept from a search query
pub const MAX_QUERY_TERMS: usize = 20;

fn latin_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\p{L}\p{M}\p{N}--\p{Han}]+").expect("latin word pattern is valid")
    })
}

fn han() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Han}").expect("han pattern is valid"))
}

/// Whether the string contains at least one Han character
pub fn contains_cjk(s: &str) -> bool {
    han().is_match(s)
}

fn is_cjk_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    han().is_match(c.encode_utf8(&mut buf))
}

/// Lower-cased Latin words in document order
pub fn latin_tokens(text: &str) -> Vec<String> {
    latin_word()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn bigrams_within(text: &str, cap: usize) -> Vec<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(cap)
        .collect();

    chars
        .windows(2)
        .filter(|pair| is_cjk_char(pair[0]) && is_cjk_char(pair[1]))
        .map(|pair| pair.iter().collect())
        .collect()
}

/// Overlapping Han bigrams from the whitespace-stripped prefix of `text`
pub fn cjk_bigrams(text: &str) -> Vec<String> {
    bigrams_within(text, CJK_PREFIX_CAP)
}

/// Token stream: Latin words followed by CJK bigrams
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = latin_tokens(text);
    tokens.extend(cjk_bigrams(text));
    tokens
}

/// Like [`tokenize`] but without the bigram prefix cap.
///
/// Used for whole-document n-gram counts where the input is already known to
/// be the full document and a truncated stream would skew the statistics.
pub fn tokenize_full(text: &str) -> Vec<String> {
    let mut tokens = latin_tokens(text);
    tokens.extend(bigrams_within(text, usize::MAX));
    tokens
}

/// Distinct query terms in first-seen order, capped at [`MAX_QUERY_TERMS`]
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_QUERY_TERMS)
        .collect()
}
