//! Helpers for turning chunks into Pinecone vector records.

use crate::chunking::DocumentChunk;
use crate::pinecone::types::VectorRecord;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Deterministic vector id for a chunk.
///
/// Re-ingesting the same file overwrites its vectors instead of duplicating them.
pub fn vector_id(chunk: &DocumentChunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source.as_bytes());
    hasher.update([0]);
    hasher.update(chunk.page.to_le_bytes());
    hasher.update((chunk.chunk_index as u64).to_le_bytes());
    hasher.update(chunk.text.as_bytes());
    let digest = hasher.finalize();
    format!("doc-{}", &hex::encode(digest)[..16])
}

/// Metadata stored with each chunk vector.
pub(crate) fn chunk_metadata(chunk: &DocumentChunk, ingested_at: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("source".into(), Value::String(chunk.source.clone()));
    metadata.insert("page".into(), Value::from(chunk.page));
    metadata.insert("chunk_text".into(), Value::String(chunk.text.clone()));
    metadata.insert("ingested_at".into(), Value::String(ingested_at.to_string()));
    metadata
}

/// Pair chunks with their embeddings.
pub fn build_records(chunks: &[DocumentChunk], embeddings: Vec<Vec<f32>>) -> Vec<VectorRecord> {
    let now = current_timestamp_rfc3339();
    chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, values)| VectorRecord {
            id: vector_id(chunk),
            values,
            metadata: chunk_metadata(chunk, &now),
        })
        .collect()
}

/// Current timestamp formatted for metadata storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
