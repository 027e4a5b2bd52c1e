use super::{EmbeddingClient, EmbeddingClientError, ModelInfo};
use async_trait::async_trait;

/// Deterministic embedding client that hashes bytes into vector slots.
///
/// Produces unit-length vectors without any model download, which keeps offline runs and tests
/// self-contained. Similar texts do not land near each other.
pub struct HashEmbeddingClient {
    model_name: String,
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client reporting `model_name` and emitting `dimension`-sized vectors.
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
        }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = (idx.wrapping_mul(31) ^ usize::from(byte)) % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            status: "loaded",
            model_name: self.model_name.clone(),
            dimension: self.dimension,
            max_seq_length: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vectors_are_deterministic_and_normalized() {
        let client = HashEmbeddingClient::new("hash", 64);
        let first = client
            .generate_embeddings(vec!["same text".into()])
            .await
            .unwrap();
        let second = client
            .generate_embeddings(vec!["same text".into()])
            .await
            .unwrap();
        assert_eq!(first, second);

        let norm = first[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn zero_dimension_is_an_error() {
        let client = HashEmbeddingClient::new("hash", 0);
        let error = client
            .generate_embeddings(vec!["text".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }
}
