//! Pinecone integration: index lifecycle, vector upserts, and record shaping.

pub mod client;
pub mod records;
pub mod types;

pub use client::PineconeService;
pub use records::{build_records, vector_id};
pub use types::{
    IndexDescription, IndexHandle, IndexStats, IndexStatus, PineconeError, ServerlessSpec,
    VectorRecord,
};
