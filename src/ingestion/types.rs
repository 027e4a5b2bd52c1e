//! Error and report types for folder ingestion.

use crate::{
    chunking::ChunkingError, config::Config, embedding::EmbeddingClientError, pdf::PdfError,
    pinecone::PineconeError,
};
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The requested folder is not on disk.
    #[error("Folder path '{0}' does not exist")]
    FolderNotFound(String),
    /// The folder exists but could not be listed.
    #[error("Failed to list PDF files: {0}")]
    Discovery(#[from] std::io::Error),
    /// A PDF could not be parsed.
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Page text could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The embedding provider failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Pinecone client construction or index setup failed.
    #[error("Pinecone request failed: {0}")]
    Pinecone(#[from] PineconeError),
}

/// Knobs applied to every ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters carried over between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Vectors per upsert request.
    pub upsert_batch_size: usize,
}

impl IngestionSettings {
    /// Read the chunking and batching settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            upsert_batch_size: config.upsert_batch_size.max(1),
        }
    }
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            upsert_batch_size: 100,
        }
    }
}

/// A PDF that was left out of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPdf {
    /// File that failed.
    pub path: PathBuf,
    /// Rendered error.
    pub reason: String,
}

/// Totals for one `ingest_folder` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// PDF files discovered in the folder, including skipped ones.
    pub pdf_files: usize,
    /// Chunks embedded across all successful files.
    pub chunks: usize,
    /// Vectors acknowledged by Pinecone.
    pub vectors_upserted: usize,
    /// Files that failed extraction, chunking, or embedding.
    pub skipped: Vec<SkippedPdf>,
}

/// Per-file counters folded into the report.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FileOutcome {
    pub(crate) chunks: usize,
    pub(crate) upserted: usize,
}
