//! Folder ingestion pipeline: PDF extraction, chunking, embedding, and Pinecone storage.

mod service;
pub mod types;

pub use service::{IngestionApi, IngestionService, PineconeTarget};
pub use types::{IngestionError, IngestionReport, IngestionSettings, SkippedPdf};
