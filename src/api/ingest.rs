//! HTTP surface of the ingestion gateway.
//!
//! - `GET /` – Service descriptor with the endpoint catalog.
//! - `GET /health` – Liveness check.
//! - `POST /ingest` – Ingest every PDF in `folder_path`, synchronously or as a fire-and-forget
//!   background task.
//! - `GET /ingest/status/{task_id}` – Placeholder status lookup; background tasks are not tracked,
//!   so every id reports `processing`.
//! - `GET /metrics` – Ingestion counters since startup.

use crate::api::{ApiError, ApiJson};
use crate::ingestion::{IngestionApi, IngestionError};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const SERVICE_NAME: &str = "ingestion-service";
const VERSION: &str = "1.0.0";

/// Build the router exposing the ingestion gateway.
pub fn create_ingest_router<S>(service: Arc<S>) -> Router
where
    S: IngestionApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ingest", post(ingest::<S>))
        .route("/ingest/status/:task_id", get(ingest_status))
        .route("/metrics", get(metrics::<S>))
        .with_state(service)
}

/// Request body for `POST /ingest`.
#[derive(Debug, Deserialize)]
struct IngestRequest {
    #[serde(default = "default_folder")]
    folder_path: String,
    #[serde(default)]
    background: bool,
}

fn default_folder() -> String {
    "data".to_string()
}

/// Response body for `POST /ingest`.
#[derive(Debug, Serialize)]
struct IngestResponse {
    message: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Ingestion Service Gateway",
        "version": VERSION,
        "endpoints": {
            "health": "/health",
            "ingest": "/ingest",
            "status": "/ingest/status/{task_id}"
        }
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: VERSION,
    })
}

/// Ingest a folder of PDFs.
///
/// `documents_processed` counts PDF files, not chunks.
async fn ingest<S>(
    State(service): State<Arc<S>>,
    ApiJson(request): ApiJson<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError>
where
    S: IngestionApi + 'static,
{
    let folder = PathBuf::from(&request.folder_path);
    if !folder.is_dir() {
        return Err(IngestionError::FolderNotFound(request.folder_path).into());
    }

    if request.background {
        let task_id = format!("ingest_{}", Uuid::new_v4().simple());
        tracing::info!(task_id = %task_id, folder = %folder.display(), "Started background ingestion task");
        tokio::spawn(run_background(service, folder, task_id.clone()));
        return Ok(Json(IngestResponse {
            message: "Ingestion started in background",
            status: "started",
            documents_processed: None,
            task_id: Some(task_id),
        }));
    }

    tracing::info!(folder = %folder.display(), "Starting synchronous ingestion");
    let report = service.ingest_folder(&folder).await?;
    Ok(Json(IngestResponse {
        message: "Ingestion completed successfully",
        status: "completed",
        documents_processed: Some(report.pdf_files),
        task_id: None,
    }))
}

async fn run_background<S>(service: Arc<S>, folder: PathBuf, task_id: String)
where
    S: IngestionApi,
{
    tracing::info!(task_id = %task_id, folder = %folder.display(), "Background ingestion starting");
    match service.ingest_folder(&folder).await {
        Ok(report) => tracing::info!(
            task_id = %task_id,
            pdf_files = report.pdf_files,
            "Background ingestion completed"
        ),
        Err(error) => {
            tracing::error!(task_id = %task_id, error = %error, "Background ingestion failed")
        }
    }
}

async fn ingest_status(Path(task_id): Path<String>) -> Json<Value> {
    Json(json!({
        "task_id": task_id,
        "status": "processing",
        "message": "Task is being processed"
    }))
}

async fn metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IngestionApi,
{
    Json(service.metrics_snapshot())
}

impl From<IngestionError> for ApiError {
    fn from(error: IngestionError) -> Self {
        match error {
            IngestionError::FolderNotFound(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, error.to_string())
            }
            other => {
                tracing::error!(error = %other, "Unexpected error during ingestion");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal server error: {other}"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_ingest_router;
    use crate::ingestion::{IngestionApi, IngestionError, IngestionReport};
    use crate::metrics::MetricsSnapshot;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct StubIngestionService {
        calls: Arc<Mutex<Vec<PathBuf>>>,
        pdf_files: usize,
        fail: bool,
    }

    impl StubIngestionService {
        fn new(pdf_files: usize) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                pdf_files,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }

        async fn recorded_calls(&self) -> Vec<PathBuf> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl IngestionApi for StubIngestionService {
        async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestionError> {
            self.calls.lock().await.push(folder.to_path_buf());
            if self.fail {
                return Err(IngestionError::Discovery(std::io::Error::other(
                    "permission denied",
                )));
            }
            Ok(IngestionReport {
                pdf_files: self.pdf_files,
                chunks: self.pdf_files * 10,
                ..IngestionReport::default()
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                pdfs_processed: 3,
                ..MetricsSnapshot::default()
            }
        }
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
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let app = create_ingest_router(Arc::new(StubIngestionService::new(0)));
        let (status, body) = send(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "healthy", "service": "ingestion-service", "version": "1.0.0" })
        );
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let app = create_ingest_router(Arc::new(StubIngestionService::new(0)));
        let (_, body) = send(app, Method::GET, "/", None).await;
        assert_eq!(body["service"], "Ingestion Service Gateway");
        assert_eq!(body["endpoints"]["status"], "/ingest/status/{task_id}");
    }

    #[tokio::test]
    async fn missing_folder_returns_400() {
        let service = Arc::new(StubIngestionService::new(0));
        let app = create_ingest_router(service.clone());
        let (status, body) = send(
            app,
            Method::POST,
            "/ingest",
            Some(json!({ "folder_path": "/no/such/folder" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Folder path '/no/such/folder' does not exist");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn file_path_is_rejected_as_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "not a folder").expect("write file");
        let service = Arc::new(StubIngestionService::new(0));
        let app = create_ingest_router(service.clone());
        let (status, body) = send(
            app,
            Method::POST,
            "/ingest",
            Some(json!({ "folder_path": file, "background": true })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("report.txt")));
        assert!(body.get("task_id").is_none());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_400_with_detail() {
        let app = create_ingest_router(Arc::new(StubIngestionService::new(0)));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/ingest")
            .header("content-type", "application/json")
            .body(Body::from("{\"folder_path\": "))
            .expect("request");
        let response = app.oneshot(request).await.expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn synchronous_ingest_reports_pdf_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Arc::new(StubIngestionService::new(2));
        let app = create_ingest_router(service.clone());
        let (status, body) = send(
            app,
            Method::POST,
            "/ingest",
            Some(json!({ "folder_path": dir.path(), "background": false })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["message"], "Ingestion completed successfully");
        assert_eq!(body["documents_processed"], 2);
        assert!(body.get("task_id").is_none());
        assert_eq!(service.recorded_calls().await, vec![dir.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn background_ingest_returns_task_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Arc::new(StubIngestionService::new(1));
        let app = create_ingest_router(service.clone());
        let (status, body) = send(
            app,
            Method::POST,
            "/ingest",
            Some(json!({ "folder_path": dir.path(), "background": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "started");
        assert_eq!(body["message"], "Ingestion started in background");
        let task_id = body["task_id"].as_str().expect("task id");
        assert!(task_id.starts_with("ingest_"));
        assert!(body.get("documents_processed").is_none());

        for _ in 0..50 {
            if !service.recorded_calls().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(service.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn pipeline_failure_returns_500() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = create_ingest_router(Arc::new(StubIngestionService::failing()));
        let (status, body) = send(
            app,
            Method::POST,
            "/ingest",
            Some(json!({ "folder_path": dir.path() })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().expect("detail");
        assert!(detail.starts_with("Internal server error: "));
        assert!(detail.contains("permission denied"));
    }

    #[tokio::test]
    async fn status_is_always_processing() {
        let app = create_ingest_router(Arc::new(StubIngestionService::new(0)));
        let (status, body) = send(app, Method::GET, "/ingest/status/ingest_abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "task_id": "ingest_abc",
                "status": "processing",
                "message": "Task is being processed"
            })
        );
    }

    #[tokio::test]
    async fn metrics_exposes_snapshot() {
        let app = create_ingest_router(Arc::new(StubIngestionService::new(0)));
        let (status, body) = send(app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pdfs_processed"], 3);
        assert_eq!(body["upsert_failures"], 0);
    }
}
