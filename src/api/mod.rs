//! HTTP surfaces for the ingestion gateway and the embedding service.
//!
//! Both routers report failures as `{ "detail": "<message>" }` and share the middleware stack
//! built by [`apply_middleware`]: request tracing, CORS, and trusted-host enforcement.

pub mod embed;
pub mod ingest;

use crate::config::Config;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use embed::{EmbedError, EmbeddingService, create_embed_router};
pub use ingest::create_ingest_router;

/// Error rendered as a JSON `detail` body with an explicit status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Build an error with the given status and message.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

/// JSON body extractor whose rejections use the `{detail}` error shape.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

/// Wrap a router with tracing, CORS, and host checks appropriate for the environment.
pub fn apply_middleware(router: Router, config: &Config) -> Router {
    let trusted = Arc::new(TrustedHosts::from_config(config));
    router
        .layer(middleware::from_fn_with_state(trusted, enforce_trusted_hosts))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// CORS policy: anything goes in development, the configured origins in production.
pub fn cors_layer(config: &Config) -> CorsLayer {
    if !config.environment.is_production()
        || config.cors_origins.iter().any(|origin| origin == "*")
    {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Host patterns accepted by the server. `None` disables the check.
#[derive(Debug, Clone)]
pub struct TrustedHosts(Option<Vec<String>>);

impl TrustedHosts {
    /// Development accepts every host; production uses `TRUSTED_HOSTS`.
    pub fn from_config(config: &Config) -> Self {
        if config.environment.is_production() {
            Self::new(config.trusted_hosts.clone())
        } else {
            Self(None)
        }
    }

    /// Build from explicit patterns. A `*` entry accepts every host.
    pub fn new(patterns: Vec<String>) -> Self {
        if patterns.iter().any(|pattern| pattern == "*") {
            Self(None)
        } else {
            Self(Some(
                patterns
                    .into_iter()
                    .map(|pattern| pattern.to_ascii_lowercase())
                    .collect(),
            ))
        }
    }

    /// Whether a `Host` header value (port included or not) is allowed.
    pub fn allows(&self, host_header: Option<&str>) -> bool {
        let Some(patterns) = &self.0 else {
            return true;
        };
        let Some(host) = host_header.map(strip_port) else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        patterns.iter().any(|pattern| host_matches(pattern, &host))
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal such as `[::1]:8000`
        return host.split_once(']').map_or(host, |(addr, _)| &host[..=addr.len()]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(domain) => host.ends_with(&format!(".{domain}")),
        None => pattern == host,
    }
}

async fn enforce_trusted_hosts(
    State(trusted): State<Arc<TrustedHosts>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    if trusted.allows(host) {
        next.run(request).await
    } else {
        tracing::warn!(host = ?host, "Rejected request with untrusted host header");
        (StatusCode::BAD_REQUEST, "Invalid host header").into_response()
    }
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::{Config, EmbeddingConfig, EmbeddingProvider, Environment};

    pub(crate) fn config(environment: Environment) -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 8000,
            environment,
            log_level: "info".into(),
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Hash,
                model: "all-MiniLM-L6-v2".into(),
                dimension: 8,
                model_dir: None,
                batch_size: 4,
                ollama_url: "http://127.0.0.1:11434".into(),
            },
            pinecone: None,
            chunk_size: 1000,
            chunk_overlap: 100,
            upsert_batch_size: 100,
            cors_origins: vec!["https://app.example.com".into()],
            trusted_hosts: vec!["api.example.com".into(), "*.internal.example.com".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use axum::{
        body::{Body, to_bytes},
        http,
        routing::{get, post},
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    async fn json_status(content_type: Option<&str>, body: &'static str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route(
            "/",
            post(|ApiJson(greeting): ApiJson<Greeting>| async move { greeting.name }),
        );
        let mut request = http::Request::builder().method(Method::POST).uri("/");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let response = app
            .oneshot(request.body(Body::from(body)).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        )
    }

    #[tokio::test]
    async fn json_rejections_render_detail_bodies() {
        let (status, body) = json_status(Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|detail| !detail.is_empty()));

        let (status, body) = json_status(Some("application/json"), "{}").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("name")));

        let (status, body) = json_status(None, r#"{"name":"ada"}"#).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn valid_json_reaches_the_handler() {
        let app = Router::new().route(
            "/",
            post(|ApiJson(greeting): ApiJson<Greeting>| async move { greeting.name }),
        );
        let response = app
            .oneshot(
                http::Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"ada"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&bytes[..], b"ada");
    }

    #[test]
    fn wildcard_allows_any_host() {
        let trusted = TrustedHosts::new(vec!["*".into()]);
        assert!(trusted.allows(Some("anything:9000")));
        assert!(trusted.allows(None));
    }

    #[test]
    fn exact_and_subdomain_patterns() {
        let trusted = TrustedHosts::new(vec!["api.example.com".into(), "*.example.org".into()]);
        assert!(trusted.allows(Some("api.example.com:8000")));
        assert!(trusted.allows(Some("API.EXAMPLE.COM")));
        assert!(trusted.allows(Some("docs.example.org")));
        assert!(!trusted.allows(Some("example.org")));
        assert!(!trusted.allows(Some("evil.com")));
        assert!(!trusted.allows(None));
    }

    #[test]
    fn ipv6_hosts_keep_brackets() {
        let trusted = TrustedHosts::new(vec!["[::1]".into()]);
        assert!(trusted.allows(Some("[::1]:8000")));
    }

    async fn status_for(environment: Environment, host: &str) -> StatusCode {
        let config = test_support::config(environment);
        let app = apply_middleware(Router::new().route("/", get(|| async { "ok" })), &config);
        app.oneshot(
            http::Request::builder()
                .uri("/")
                .header("host", host)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
        .status()
    }

    #[tokio::test]
    async fn production_rejects_untrusted_hosts() {
        assert_eq!(
            status_for(Environment::Production, "evil.com").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Environment::Production, "api.example.com:8000").await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(Environment::Production, "a.internal.example.com").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn development_accepts_any_host() {
        assert_eq!(
            status_for(Environment::Development, "evil.com").await,
            StatusCode::OK
        );
    }
}
