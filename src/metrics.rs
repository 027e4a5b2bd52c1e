use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity since startup.
#[derive(Default)]
pub struct IngestMetrics {
    pdfs_processed: AtomicU64,
    pdfs_failed: AtomicU64,
    chunks_embedded: AtomicU64,
    vectors_upserted: AtomicU64,
    upsert_failures: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a PDF that made it through extraction, chunking, and embedding.
    pub fn record_pdf(&self, chunk_count: u64) {
        self.pdfs_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_embedded
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a PDF that was skipped because of an error.
    pub fn record_failed_pdf(&self) {
        self.pdfs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful upsert batch.
    pub fn record_upsert(&self, vectors: u64) {
        self.vectors_upserted.fetch_add(vectors, Ordering::Relaxed);
    }

    /// Record a rejected upsert batch.
    pub fn record_upsert_failure(&self) {
        self.upsert_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pdfs_processed: self.pdfs_processed.load(Ordering::Relaxed),
            pdfs_failed: self.pdfs_failed.load(Ordering::Relaxed),
            chunks_embedded: self.chunks_embedded.load(Ordering::Relaxed),
            vectors_upserted: self.vectors_upserted.load(Ordering::Relaxed),
            upsert_failures: self.upsert_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// PDFs fully processed.
    pub pdfs_processed: u64,
    /// PDFs skipped after an extraction, chunking, or embedding failure.
    pub pdfs_failed: u64,
    /// Chunks embedded across all processed PDFs.
    pub chunks_embedded: u64,
    /// Vectors acknowledged by the vector index.
    pub vectors_upserted: u64,
    /// Upsert batches rejected by the vector index.
    pub upsert_failures: u64,
}
