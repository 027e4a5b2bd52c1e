//! Local sentence-transformer inference with ONNX Runtime.
//!
//! The model (`model.onnx`) and its tokenizer (`tokenizer.json`) are read from
//! `EMBEDDING_MODEL_DIR` when set, otherwise fetched from the Hugging Face hub repository of the
//! configured model. Loading happens on the first embedding request and is shared afterwards.
//!
//! Sentence vectors are the attention-masked mean of the token embeddings, L2-normalized, which
//! matches the pooling and normalization stages of the `sentence-transformers` checkpoints.

use super::{EmbeddingClient, EmbeddingClientError, ModelInfo, verify_embeddings};
use crate::config::EmbeddingConfig;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use ndarray::{Array2, ArrayView3, Axis, Ix3};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::OnceCell;

const MAX_SEQ_LENGTH: usize = 256;
const MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Embedding client running a sentence-transformer checkpoint in-process.
pub struct SentenceTransformerClient {
    model_name: String,
    dimension: usize,
    batch_size: usize,
    model_dir: Option<PathBuf>,
    model: OnceCell<Arc<LoadedModel>>,
}

struct LoadedModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl SentenceTransformerClient {
    /// Prepare a client for the configured model without loading it.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model_name: config.qualified_model_name(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            model_dir: config.model_dir.as_ref().map(PathBuf::from),
            model: OnceCell::new(),
        }
    }

    async fn loaded(&self) -> Result<Arc<LoadedModel>, EmbeddingClientError> {
        self.model
            .get_or_try_init(|| async {
                tracing::info!(model = %self.model_name, "Loading embedding model");
                let loaded = self.load().await.map_err(|err| {
                    tracing::error!(model = %self.model_name, error = %format!("{err:#}"), "Failed to load embedding model");
                    EmbeddingClientError::ModelLoad(format!("{err:#}"))
                })?;
                tracing::info!(model = %self.model_name, "Successfully loaded embedding model");
                Ok::<_, EmbeddingClientError>(Arc::new(loaded))
            })
            .await
            .cloned()
    }

    async fn load(&self) -> anyhow::Result<LoadedModel> {
        let (model_path, tokenizer_path) = self.resolve_files().await?;
        tokio::task::spawn_blocking(move || LoadedModel::from_files(&model_path, &tokenizer_path))
            .await
            .context("model loading task failed")?
    }

    async fn resolve_files(&self) -> anyhow::Result<(PathBuf, PathBuf)> {
        if let Some(dir) = &self.model_dir {
            let model_path = [dir.join("model.onnx"), dir.join(MODEL_FILE)]
                .into_iter()
                .find(|candidate| candidate.exists())
                .ok_or_else(|| anyhow!("no model.onnx found under {}", dir.display()))?;
            return Ok((model_path, dir.join(TOKENIZER_FILE)));
        }

        let api = hf_hub::api::tokio::Api::new().context("failed to initialize Hugging Face hub client")?;
        let repo = api.model(self.model_name.clone());
        let model_path = repo
            .get(MODEL_FILE)
            .await
            .with_context(|| format!("failed to fetch {MODEL_FILE} for {}", self.model_name))?;
        let tokenizer_path = repo
            .get(TOKENIZER_FILE)
            .await
            .with_context(|| format!("failed to fetch {TOKENIZER_FILE} for {}", self.model_name))?;
        Ok((model_path, tokenizer_path))
    }
}

impl LoadedModel {
    fn from_files(model_path: &Path, tokenizer_path: &Path) -> anyhow::Result<Self> {
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|err| anyhow!("Failed to load tokenizer: {err}"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LENGTH,
                ..Default::default()
            }))
            .map_err(|err| anyhow!("Failed to configure truncation: {err}"))?;
        tokenizer.with_padding(None);

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|err| anyhow!("Tokenization failed: {err}"))?;

        let batch = encodings.len();
        let max_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);

        let mut input_ids = Array2::<i64>::zeros((batch, max_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, max_len));
        let token_type_ids = Array2::<i64>::zeros((batch, max_len));

        for (row, encoding) in encodings.iter().enumerate() {
            for (col, (&id, &mask)) in encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .enumerate()
            {
                input_ids[[row, col]] = i64::from(id);
                attention_mask[[row, col]] = i64::from(mask);
            }
        }

        let mask_for_pooling = attention_mask.clone();
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        let hidden = hidden
            .into_dimensionality::<Ix3>()
            .context("Model output is not [batch, seq_len, hidden]")?;

        Ok(mean_pool_normalized(hidden, &mask_for_pooling))
    }
}

/// Attention-masked mean over the sequence axis followed by L2 normalization.
fn mean_pool_normalized(hidden: ArrayView3<'_, f32>, mask: &Array2<i64>) -> Vec<Vec<f32>> {
    hidden
        .axis_iter(Axis(0))
        .zip(mask.axis_iter(Axis(0)))
        .map(|(tokens, row_mask)| {
            let hidden_dim = tokens.shape()[1];
            let mut pooled = vec![0.0_f32; hidden_dim];
            let mut weight = 0.0_f32;
            for (token, &flag) in tokens.axis_iter(Axis(0)).zip(row_mask.iter()) {
                if flag == 0 {
                    continue;
                }
                weight += 1.0;
                for (slot, value) in pooled.iter_mut().zip(token.iter()) {
                    *slot += *value;
                }
            }
            let weight = weight.max(1e-9);
            for slot in &mut pooled {
                *slot /= weight;
            }

            let norm = pooled.iter().map(|v| v * v).sum::<f32>().sqrt().max(1e-12);
            for slot in &mut pooled {
                *slot /= norm;
            }
            pooled
        })
        .collect()
}

#[async_trait]
impl EmbeddingClient for SentenceTransformerClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.loaded().await?;
        let batch_size = self.batch_size;
        let expected = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Vec<f32>>> {
            let mut all = Vec::with_capacity(texts.len());
            for batch in texts.chunks(batch_size) {
                all.extend(model.embed_batch(batch)?);
            }
            Ok(all)
        })
        .await
        .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?
        .map_err(|err| EmbeddingClientError::GenerationFailed(format!("{err:#}")))?;

        verify_embeddings(expected, self.dimension, &embeddings)?;
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_info(&self) -> ModelInfo {
        let loaded = self.model.initialized();
        ModelInfo {
            status: if loaded { "loaded" } else { "not_loaded" },
            model_name: self.model_name.clone(),
            dimension: self.dimension,
            max_seq_length: loaded.then_some(MAX_SEQ_LENGTH),
        }
    }
}
