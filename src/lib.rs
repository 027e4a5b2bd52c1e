#![deny(missing_docs)]

//! Core library for the pdfvec ingestion gateway and embedding service.

/// HTTP routing, middleware, and REST handlers.
pub mod api;
/// Character-budget chunking of page text.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Folder ingestion pipeline.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// PDF discovery and text extraction.
pub mod pdf;
/// Pinecone vector index integration.
pub mod pinecone;
