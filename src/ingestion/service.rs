//! Ingestion service coordinating PDF extraction, chunking, embedding, and Pinecone writes.

use crate::{
    chunking::split_pages,
    config::{Config, PineconeConfig},
    embedding::{SharedEmbeddingClient, build_embedding_client},
    ingestion::types::{
        FileOutcome, IngestionError, IngestionReport, IngestionSettings, SkippedPdf,
    },
    metrics::{IngestMetrics, MetricsSnapshot},
    pdf::{discover_pdf_files, extract_pages},
    pinecone::{IndexHandle, PineconeService, ServerlessSpec, VectorRecord, build_records},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Pinecone client plus the index it writes to.
pub struct PineconeTarget {
    /// Transport used for control- and data-plane calls.
    pub service: PineconeService,
    /// Normalized index name.
    pub index_name: String,
    /// Placement used when the index has to be created.
    pub spec: ServerlessSpec,
}

impl PineconeTarget {
    /// Build a target from the Pinecone configuration section.
    pub fn from_config(config: &PineconeConfig) -> Result<Self, IngestionError> {
        Ok(Self {
            service: PineconeService::new(config)?,
            index_name: config.index_name.clone(),
            spec: ServerlessSpec {
                cloud: config.cloud.clone(),
                region: config.region.clone(),
            },
        })
    }
}

/// Runs folder ingestion end to end.
///
/// The service owns long-lived handles to the embedding client, the optional Pinecone target,
/// and the metrics registry. Build it once at startup and share it through an `Arc`; background
/// runs spawned by the HTTP layer hold their own clone.
pub struct IngestionService {
    embedding_client: SharedEmbeddingClient,
    pinecone: Option<PineconeTarget>,
    settings: IngestionSettings,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the ingestion pipeline used by the HTTP surface.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Ingest every PDF directly inside `folder`.
    async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl IngestionService {
    /// Build the service from configuration.
    ///
    /// Pinecone storage is enabled only when the configuration carries a complete Pinecone section.
    pub fn new(config: &Config) -> Result<Self, IngestionError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = build_embedding_client(&config.embedding)?;
        let pinecone = config
            .pinecone
            .as_ref()
            .map(PineconeTarget::from_config)
            .transpose()?;

        Ok(Self::from_parts(
            embedding_client,
            pinecone,
            IngestionSettings::from_config(config),
        ))
    }

    /// Assemble a service from already-built components.
    pub fn from_parts(
        embedding_client: SharedEmbeddingClient,
        pinecone: Option<PineconeTarget>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            embedding_client,
            pinecone,
            settings,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Ingest every PDF directly inside `folder`.
    ///
    /// Individual file failures are logged and listed in [`IngestionReport::skipped`]; only a
    /// missing or unreadable folder fails the run.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestionError> {
        if !folder.is_dir() {
            return Err(IngestionError::FolderNotFound(folder.display().to_string()));
        }

        self.log_pinecone_configuration();

        tracing::info!(folder = %folder.display(), "Searching for PDF files");
        let files = discover_pdf_files(folder)?;
        tracing::info!(folder = %folder.display(), count = files.len(), files = ?files, "Found PDF files");

        let mut report = IngestionReport {
            pdf_files: files.len(),
            ..IngestionReport::default()
        };
        if files.is_empty() {
            tracing::warn!(folder = %folder.display(), "No PDF files found");
            return Ok(report);
        }

        let index = self.prepare_index().await;

        for path in &files {
            match self.ingest_file(path, index.as_ref()).await {
                Ok(outcome) => {
                    self.metrics.record_pdf(outcome.chunks as u64);
                    report.chunks += outcome.chunks;
                    report.vectors_upserted += outcome.upserted;
                    tracing::info!(
                        file = %path.display(),
                        chunks = outcome.chunks,
                        "Added chunks to processing list"
                    );
                }
                Err(error) => {
                    self.metrics.record_failed_pdf();
                    tracing::error!(file = %path.display(), error = %error, "Error loading PDF");
                    report.skipped.push(SkippedPdf {
                        path: path.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            folder = %folder.display(),
            pdf_files = report.pdf_files,
            chunks = report.chunks,
            vectors_upserted = report.vectors_upserted,
            skipped = report.skipped.len(),
            "Total documents loaded"
        );
        Ok(report)
    }

    fn log_pinecone_configuration(&self) {
        match &self.pinecone {
            Some(target) => tracing::info!(
                api_key = "Set",
                environment = "Set",
                index = %target.index_name,
                "Pinecone configuration check"
            ),
            None => tracing::info!(
                configured = false,
                "Pinecone configuration check: key, environment, or index name not set"
            ),
        }
    }

    /// Ensure the index exists. A failure disables storage for this run only.
    async fn prepare_index(&self) -> Option<IndexHandle> {
        let target = self.pinecone.as_ref()?;
        tracing::info!(index = %target.index_name, "Initializing Pinecone");
        match target
            .service
            .ensure_index(
                &target.index_name,
                self.embedding_client.dimension(),
                &target.spec,
            )
            .await
        {
            Ok(handle) => Some(handle),
            Err(error) => {
                tracing::error!(index = %target.index_name, error = %error, "Failed to initialize Pinecone");
                tracing::warn!("Continuing without Pinecone storage");
                None
            }
        }
    }

    async fn ingest_file(
        &self,
        path: &Path,
        index: Option<&IndexHandle>,
    ) -> Result<FileOutcome, IngestionError> {
        tracing::info!(file = %path.display(), "Loading PDF");
        let pages = extract_pages(path).await?;
        tracing::info!(file = %path.display(), pages = pages.len(), "Loaded pages");

        let source = path.display().to_string();
        let chunks = split_pages(
            &source,
            &pages,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )?;
        tracing::debug!(file = %source, chunks = chunks.len(), "Created chunks");
        if chunks.is_empty() {
            tracing::warn!(file = %source, "No extractable text");
            return Ok(FileOutcome::default());
        }

        tracing::info!(file = %source, "Generating embeddings");
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding_client.generate_embeddings(texts).await?;
        tracing::debug!(file = %source, embeddings = embeddings.len(), "Generated embeddings");

        let upserted = match (self.pinecone.as_ref(), index) {
            (Some(target), Some(index)) => {
                let records = build_records(&chunks, embeddings);
                self.store(&target.service, index, &source, &records).await
            }
            _ => {
                tracing::warn!(file = %source, "Pinecone configuration incomplete, skipping Pinecone storage");
                0
            }
        };

        Ok(FileOutcome {
            chunks: chunks.len(),
            upserted,
        })
    }

    /// Upsert in batches; a rejected batch is logged and the rest still go out.
    async fn store(
        &self,
        service: &PineconeService,
        index: &IndexHandle,
        source: &str,
        records: &[VectorRecord],
    ) -> usize {
        tracing::info!(file = source, index = %index.name, "Storing in Pinecone");
        let mut upserted = 0;
        for batch in records.chunks(self.settings.upsert_batch_size.max(1)) {
            match service.upsert(index, batch).await {
                Ok(count) => {
                    self.metrics.record_upsert(count as u64);
                    upserted += count;
                }
                Err(error) => {
                    self.metrics.record_upsert_failure();
                    tracing::warn!(file = source, error = %error, "Failed to store in Pinecone");
                }
            }
        }
        if upserted == records.len() {
            tracing::info!(file = source, vectors = upserted, "Successfully stored chunks in Pinecone");
        } else {
            tracing::info!(file = source, vectors = upserted, expected = records.len(), "Continuing without full Pinecone storage");
        }
        upserted
    }
}

#[async_trait]
impl IngestionApi for IngestionService {
    async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestionError> {
        IngestionService::ingest_folder(self, folder).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
