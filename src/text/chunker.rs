//! Overlapping fixed-size windows over a document
//!
//! Sizes are measured in characters, so a window never splits a code point.

use tracing::warn;

/// Split `text` into windows of at most `chunk_size` characters where
/// consecutive windows share `overlap` characters.
///
/// The last window always ends at the end of the input and no empty window is
/// produced. A degenerate configuration (`chunk_size <= overlap`) yields the
/// whole input as a single chunk.
pub fn split_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    if chunk_size == 0 || chunk_size <= overlap {
        warn!(
            "Degenerate chunking (chunk_size={}, overlap={}), using whole text as one chunk",
            chunk_size, overlap
        );
        return vec![text];
    }

    // Byte offset of every char boundary, including the end of the string
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let char_len = bounds.len() - 1;

    let step = (chunk_size - overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        chunks.push(&text[bounds[start]..bounds[end]]);
        if end >= char_len {
            break;
        }
        start += step;
    }

    chunks
}
