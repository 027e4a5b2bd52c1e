//! Character-budget chunking of extracted page text.
//!
//! Splitting is delegated to `semchunk-rs` with a character counter, so boundaries prefer
//! paragraph breaks, then line breaks, then sentence and word boundaries. A sliding overlap is
//! stitched on afterwards: each chunk after the first is prefixed with the tail of its
//! predecessor, and the result is trimmed from the front so it never exceeds the budget.

use crate::pdf::PageText;
use semchunk_rs::Chunker;
use thiserror::Error;

/// Errors produced while turning page text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// A chunk of page text with the metadata attached to its vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    /// Path of the PDF the chunk came from.
    pub source: String,
    /// Zero-based page number.
    pub page: u32,
    /// Position of the chunk within its file.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: String,
}

/// Split every page of a document and tag the chunks with their origin.
///
/// Pages without text contribute nothing; `chunk_index` runs across the whole file.
pub fn split_pages(
    source: &str,
    pages: &[PageText],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<DocumentChunk>, ChunkingError> {
    let mut chunks = Vec::new();
    for page in pages {
        for text in chunk_text(&page.text, chunk_size, overlap)? {
            chunks.push(DocumentChunk {
                source: source.to_string(),
                page: page.page,
                chunk_index: chunks.len(),
                text,
            });
        }
    }
    Ok(chunks)
}

/// Chunk text into segments of at most `chunk_size` characters.
///
/// Returns an empty vector when the input is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunker = Chunker::new(chunk_size, Box::new(char_count));
    let base_chunks: Vec<String> = chunker
        .chunk(text)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .flat_map(|chunk| split_to_budget(chunk, chunk_size))
        .collect();
    Ok(apply_overlap(base_chunks, chunk_size, overlap))
}

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Re-split a chunk that overshoots the budget, cutting at the last whitespace that fits.
///
/// A single word longer than the budget is cut mid-word.
fn split_to_budget(chunk: String, limit: usize) -> Vec<String> {
    if char_count(&chunk) <= limit {
        return vec![chunk];
    }

    let mut pieces = Vec::new();
    let mut rest = chunk.trim();
    while char_count(rest) > limit {
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(offset, _)| offset);
        let cut = if rest[window_end..].starts_with(char::is_whitespace) {
            window_end
        } else {
            match rest[..window_end].rfind(char::is_whitespace) {
                Some(boundary) if boundary > 0 => boundary,
                _ => window_end,
            }
        };
        let piece = rest[..cut].trim_end();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if effective_overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;

    for current in chunks {
        let stitched = match previous.as_deref() {
            Some(prev) => {
                let tail = tail_within(prev, effective_overlap);
                let mut combined = String::with_capacity(tail.len() + current.len() + 1);
                if !tail.is_empty() {
                    combined.push_str(tail);
                    if !tail.ends_with(char::is_whitespace)
                        && !current.starts_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
                combined.push_str(&current);
                tail_within(&combined, chunk_size).to_string()
            }
            None => current.clone(),
        };
        overlapped.push(stitched);
        previous = Some(current);
    }

    overlapped
}

/// Longest suffix of `text` holding at most `limit` characters, starting on a word boundary.
///
/// When the cut lands inside a word, the partial word is dropped so overlaps never start
/// mid-token. Leading whitespace is trimmed.
fn tail_within(text: &str, limit: usize) -> &str {
    let total = char_count(text);
    if total <= limit {
        return text.trim_start();
    }

    let skip = total - limit;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    let mid_word = text[..start]
        .chars()
        .next_back()
        .map(|c| !c.is_whitespace())
        .unwrap_or(false);

    let candidate = &text[start..];
    if mid_word {
        match candidate.find(char::is_whitespace) {
            Some(boundary) => candidate[boundary..].trim_start(),
            None => candidate,
        }
    } else {
        candidate.trim_start()
    }
}
