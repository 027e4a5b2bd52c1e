use super::{EmbeddingClient, EmbeddingClientError, ModelInfo, verify_embeddings};
use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

/// Embedding client backed by an Ollama runtime (e.g. the `all-minilm` model).
pub struct OllamaEmbeddingClient {
    client: Ollama,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingClient {
    /// Connect to the Ollama server at `url`.
    pub fn new(url: &str, model: &str, dimension: usize) -> Result<Self, EmbeddingClientError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| EmbeddingClientError::ModelLoad(format!("invalid OLLAMA_URL: {err}")))?;
        let host = parsed.host_str().ok_or_else(|| {
            EmbeddingClientError::ModelLoad(format!("OLLAMA_URL has no host: {url}"))
        })?;
        let port = parsed.port_or_known_default().unwrap_or(11434);
        let base = format!("{}://{}", parsed.scheme(), host);
        tracing::debug!(url = %base, port, model, "Initialized Ollama embedding client");

        Ok(Self {
            client: Ollama::new(base, port),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request =
            GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(texts));
        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?;

        verify_embeddings(expected, self.dimension, &response.embeddings)?;
        Ok(response.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            status: "loaded",
            model_name: self.model.clone(),
            dimension: self.dimension,
            max_seq_length: None,
        }
    }
}
