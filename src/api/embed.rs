//! HTTP surface of the embedding service.
//!
//! - `GET /` – Service descriptor including the active environment.
//! - `GET /health` – Liveness check.
//! - `POST /embed/` (also `/embed`) – Embed a single text of 1 to 10000 characters.
//! - `GET /embed/model` – Identity and load state of the backing model.

use crate::api::{ApiError, ApiJson};
use crate::config::Environment;
use crate::embedding::{EmbeddingClientError, ModelInfo, SharedEmbeddingClient};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

const SERVICE_NAME: &str = "Semantic Retrieval Service";
const VERSION: &str = "0.1.0";
/// Longest text accepted by `POST /embed/`, in characters.
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Errors surfaced by the embedding endpoint.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Input text failed validation.
    #[error("text must be between 1 and {MAX_TEXT_LENGTH} characters, got {0}")]
    InvalidLength(usize),
    /// The provider could not embed the text.
    #[error(transparent)]
    Generation(#[from] EmbeddingClientError),
}

/// Request body for `POST /embed/`.
#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,
}

/// Response body for `POST /embed/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResponse {
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Model that produced the vector.
    pub model_name: String,
    /// Length of the input text in characters.
    pub text_length: usize,
}

/// Single-text embedding on top of a shared provider.
pub struct EmbeddingService {
    client: SharedEmbeddingClient,
}

impl EmbeddingService {
    /// Wrap a provider.
    pub fn new(client: SharedEmbeddingClient) -> Self {
        Self { client }
    }

    /// Validate and embed one text.
    pub async fn generate_embedding(&self, text: &str) -> Result<EmbeddingResponse, EmbedError> {
        let text_length = text.chars().count();
        if !(1..=MAX_TEXT_LENGTH).contains(&text_length) {
            return Err(EmbedError::InvalidLength(text_length));
        }

        tracing::debug!(text_length, "Generating embedding");
        let mut vectors = self
            .client
            .generate_embeddings(vec![text.to_string()])
            .await?;
        let embedding = vectors.pop().ok_or(EmbeddingClientError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
        tracing::debug!(dimension = embedding.len(), "Generated embedding");

        Ok(EmbeddingResponse {
            embedding,
            model_name: self.client.model_name().to_string(),
            text_length,
        })
    }

    /// Identity and load state of the model.
    pub fn model_info(&self) -> ModelInfo {
        self.client.model_info()
    }
}

#[derive(Clone)]
struct EmbedState {
    service: Arc<EmbeddingService>,
    environment: Environment,
}

/// Build the router exposing the embedding service.
pub fn create_embed_router(service: Arc<EmbeddingService>, environment: Environment) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/embed/", post(embed))
        .route("/embed", post(embed))
        .route("/embed/model", get(model))
        .with_state(EmbedState {
            service,
            environment,
        })
}

async fn root(State(state): State<EmbedState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "status": "running",
        "environment": state.environment.as_str(),
        "endpoints": { "embed": "/embed/" }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "embedding-service",
        "version": VERSION
    }))
}

async fn embed(
    State(state): State<EmbedState>,
    ApiJson(request): ApiJson<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let response = state.service.generate_embedding(&request.text).await?;
    Ok(Json(response))
}

async fn model(State(state): State<EmbedState>) -> Json<ModelInfo> {
    Json(state.service.model_info())
}

impl From<EmbedError> for ApiError {
    fn from(error: EmbedError) -> Self {
        match error {
            EmbedError::InvalidLength(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            EmbedError::Generation(inner) => {
                tracing::error!(error = %inner, "Embedding generation failed");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to generate embedding: {inner}"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingClient, HashEmbeddingClient};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    struct FailingClient;

    #[async_trait]
    impl EmbeddingClient for FailingClient {
        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Err(EmbeddingClientError::ModelLoad("weights missing".into()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }

        fn dimension(&self) -> usize {
            384
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                status: "not_loaded",
                model_name: "broken".into(),
                dimension: 384,
                max_seq_length: None,
            }
        }
    }

    fn hash_app() -> Router {
        let client = Arc::new(HashEmbeddingClient::new(
            "sentence-transformers/all-MiniLM-L6-v2",
            384,
        ));
        create_embed_router(
            Arc::new(EmbeddingService::new(client)),
            Environment::Development,
        )
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn embeds_text_with_fixed_dimension() {
        let (status, body) = send(
            hash_app(),
            Method::POST,
            "/embed/",
            Some(json!({ "text": "héllo world" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedding"].as_array().map(Vec::len), Some(384));
        assert_eq!(body["model_name"], "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(body["text_length"], 11);
    }

    #[tokio::test]
    async fn route_without_trailing_slash_is_served() {
        let (status, _) = send(
            hash_app(),
            Method::POST,
            "/embed",
            Some(json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_text_is_unprocessable() {
        let (status, body) = send(
            hash_app(),
            Method::POST,
            "/embed/",
            Some(json!({ "text": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn oversized_text_is_unprocessable() {
        let text = "a".repeat(MAX_TEXT_LENGTH + 1);
        let (status, _) = send(hash_app(), Method::POST, "/embed/", Some(json!({ "text": text })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let text = "a".repeat(MAX_TEXT_LENGTH);
        let (status, _) = send(hash_app(), Method::POST, "/embed/", Some(json!({ "text": text })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_text_field_is_unprocessable_with_detail() {
        let (status, body) = send(hash_app(), Method::POST, "/embed/", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("text")));
    }

    #[tokio::test]
    async fn malformed_json_is_400_with_detail() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/embed/")
            .header("content-type", "application/json")
            .body(Body::from("{\"text\": "))
            .expect("request");
        let response = hash_app().oneshot(request).await.expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_500_with_detail() {
        let app = create_embed_router(
            Arc::new(EmbeddingService::new(Arc::new(FailingClient))),
            Environment::Production,
        );
        let (status, body) = send(app, Method::POST, "/embed/", Some(json!({ "text": "hi" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().expect("detail");
        assert!(detail.starts_with("Failed to generate embedding: "));
        assert!(detail.contains("weights missing"));
    }

    #[tokio::test]
    async fn root_reports_environment() {
        let (status, body) = send(hash_app(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "Semantic Retrieval Service");
        assert_eq!(body["status"], "running");
        assert_eq!(body["environment"], "dev");
        assert_eq!(body["endpoints"]["embed"], "/embed/");
    }

    #[tokio::test]
    async fn health_and_model_info() {
        let (status, body) = send(hash_app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(hash_app(), Method::GET, "/embed/model", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_name"], "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(body["dimension"], 384);
    }
}
