//! Text primitives shared by term extraction and keyword search

mod chunker;
mod tokenizer;

pub use chunker::split_chunks;
pub use tokenizer::{
    cjk_bigrams, contains_cjk, latin_tokens, query_terms, tokenize, tokenize_full,
    CJK_PREFIX_CAP, MAX_QUERY_TERMS,
};
