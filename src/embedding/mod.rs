//! Embedding client abstraction and provider adapters.

mod hashed;
mod ollama;
mod onnx;

pub use hashed::HashEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use onnx::SentenceTransformerClient;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Model weights or tokenizer could not be loaded.
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider returned a different number of vectors than inputs.
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch {
        /// Number of input texts.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// Returned vectors do not match the configured dimensionality.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the model.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Load state and identity of the model behind a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// `loaded` once the model is ready, `not_loaded` before first use.
    pub status: &'static str,
    /// Fully-qualified model name.
    pub model_name: String,
    /// Output dimensionality.
    pub dimension: usize,
    /// Token limit applied before inference, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_seq_length: Option<usize>,
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Name reported alongside generated vectors.
    fn model_name(&self) -> &str;

    /// Dimensionality of every vector this client produces.
    fn dimension(&self) -> usize;

    /// Describe the model and whether it is loaded.
    fn model_info(&self) -> ModelInfo;
}

/// Shared handle to a provider, cloned into handlers and background tasks.
pub type SharedEmbeddingClient = Arc<dyn EmbeddingClient>;

/// Build an embedding client for the configured provider.
///
/// Construction is cheap; local models are loaded lazily on first use.
pub fn build_embedding_client(
    config: &EmbeddingConfig,
) -> Result<SharedEmbeddingClient, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.provider,
        model = %config.model,
        dimension = config.dimension,
        "Building embedding client"
    );
    let client: SharedEmbeddingClient = match config.provider {
        EmbeddingProvider::Onnx => Arc::new(SentenceTransformerClient::new(config)),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.model,
            config.dimension,
        )?),
        EmbeddingProvider::Hash => Arc::new(HashEmbeddingClient::new(
            config.qualified_model_name(),
            config.dimension,
        )),
    };
    Ok(client)
}

/// Check that a provider answered with one vector of the expected size per input.
pub(crate) fn verify_embeddings(
    expected_count: usize,
    dimension: usize,
    embeddings: &[Vec<f32>],
) -> Result<(), EmbeddingClientError> {
    if embeddings.len() != expected_count {
        return Err(EmbeddingClientError::CountMismatch {
            expected: expected_count,
            actual: embeddings.len(),
        });
    }
    if let Some(vector) = embeddings.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_rejects_wrong_count() {
        let error = verify_embeddings(2, 3, &[vec![0.0; 3]]).unwrap_err();
        assert!(matches!(
            error,
            EmbeddingClientError::CountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn verify_rejects_wrong_dimension() {
        let error = verify_embeddings(2, 3, &[vec![0.0; 3], vec![0.0; 4]]).unwrap_err();
        assert!(matches!(
            error,
            EmbeddingClientError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn builds_hash_client_from_config() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hash,
            model: "all-MiniLM-L6-v2".into(),
            dimension: 384,
            model_dir: None,
            batch_size: 32,
            ollama_url: "http://127.0.0.1:11434".into(),
        };
        let client = build_embedding_client(&config).expect("client");
        assert_eq!(client.dimension(), 384);
        assert_eq!(client.model_name(), "sentence-transformers/all-MiniLM-L6-v2");

        let vectors = client
            .generate_embeddings(vec!["hello".into(), "world".into()])
            .await
            .expect("vectors");
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|vector| vector.len() == 384));
    }
}
