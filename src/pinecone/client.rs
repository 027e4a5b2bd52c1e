//! HTTP client wrapper for the Pinecone control and data planes.

use crate::config::PineconeConfig;
use crate::pinecone::types::{
    IndexDescription, IndexHandle, IndexStats, ListIndexesResponse, PineconeError,
    ServerlessSpec, UpsertResponse, VectorRecord,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use std::time::{Duration, Instant};

const API_VERSION: &str = "2024-07";

/// Lightweight HTTP client for Pinecone operations.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) controller_url: String,
    pub(crate) api_key: String,
    pub(crate) ready_timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl PineconeService {
    /// Construct a client from the Pinecone section of the configuration.
    pub fn new(config: &PineconeConfig) -> Result<Self, PineconeError> {
        let client = Client::builder().user_agent("pdfvec/1.0").build()?;
        let controller_url =
            normalize_base_url(&config.controller_url).map_err(PineconeError::InvalidUrl)?;
        tracing::debug!(
            url = %controller_url,
            environment = %config.environment,
            has_api_key = !config.api_key.is_empty(),
            "Initialized Pinecone HTTP client"
        );

        Ok(Self {
            client,
            controller_url,
            api_key: config.api_key.clone(),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Retrieve descriptions of every index in the project.
    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, PineconeError> {
        let response = self.control(Method::GET, "indexes").send().await?;
        if response.status().is_success() {
            let payload: ListIndexesResponse = response.json().await?;
            Ok(payload.indexes)
        } else {
            Err(self.failure(response, "Failed to list indexes").await)
        }
    }

    /// Whether an index with this name exists.
    pub async fn has_index(&self, name: &str) -> Result<bool, PineconeError> {
        Ok(self.describe_index(name).await?.is_some())
    }

    /// Describe an index, returning `None` when it does not exist.
    pub async fn describe_index(
        &self,
        name: &str,
    ) -> Result<Option<IndexDescription>, PineconeError> {
        let response = self
            .control(Method::GET, &format!("indexes/{name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(self.failure(response, "Index description failed").await),
        }
    }

    /// Create a serverless index using cosine similarity.
    ///
    /// An index that already exists is not an error.
    pub async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        spec: &ServerlessSpec,
    ) -> Result<(), PineconeError> {
        let body = json!({
            "name": name,
            "dimension": dimension,
            "metric": "cosine",
            "spec": { "serverless": spec },
        });

        let response = self
            .control(Method::POST, "indexes")
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => {
                tracing::debug!(index = name, "Index already exists");
                Ok(())
            }
            status if status.is_success() => {
                tracing::info!(index = name, dimension, "Created Pinecone index");
                Ok(())
            }
            _ => Err(self.failure(response, "Index creation failed").await),
        }
    }

    /// Delete an index. Deleting a missing index is not an error.
    pub async fn delete_index(&self, name: &str) -> Result<(), PineconeError> {
        let response = self
            .control(Method::DELETE, &format!("indexes/{name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                tracing::info!(index = name, "Deleted Pinecone index");
                Ok(())
            }
            _ => Err(self.failure(response, "Index deletion failed").await),
        }
    }

    /// Poll the control plane until the index reports ready.
    pub async fn wait_until_ready(&self, name: &str) -> Result<IndexDescription, PineconeError> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if let Some(description) = self.describe_index(name).await?
                && description.is_ready()
            {
                return Ok(description);
            }
            if Instant::now() >= deadline {
                return Err(PineconeError::Timeout {
                    index: name.to_string(),
                    state: "ready",
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_until_deleted(&self, name: &str) -> Result<(), PineconeError> {
        let deadline = Instant::now() + self.ready_timeout;
        while self.has_index(name).await? {
            if Instant::now() >= deadline {
                return Err(PineconeError::Timeout {
                    index: name.to_string(),
                    state: "deleted",
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Make sure `name` exists with the expected dimension and return its data-plane handle.
    ///
    /// A missing index is created. An existing index whose stored dimension differs is deleted and
    /// recreated. When the stats request itself fails the existing index is used as is.
    pub async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        spec: &ServerlessSpec,
    ) -> Result<IndexHandle, PineconeError> {
        let description = match self.describe_index(name).await? {
            None => {
                tracing::info!(index = name, "Creating Pinecone index");
                self.create_index(name, dimension, spec).await?;
                self.wait_until_ready(name).await?
            }
            Some(existing) => {
                tracing::info!(index = name, "Using existing Pinecone index");
                let handle = self.handle_for(&existing)?;
                match self.describe_index_stats(&handle).await {
                    Ok(stats) => {
                        let current = stats.dimension.or(existing.dimension);
                        if current.is_some_and(|current| current != dimension) {
                            tracing::info!(
                                index = name,
                                current = ?current,
                                expected = dimension,
                                "Index dimension mismatch; recreating"
                            );
                            self.delete_index(name).await?;
                            self.wait_until_deleted(name).await?;
                            self.create_index(name, dimension, spec).await?;
                            self.wait_until_ready(name).await?
                        } else {
                            return Ok(handle);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(index = name, error = %error, "Could not check index stats");
                        return Ok(handle);
                    }
                }
            }
        };

        self.handle_for(&description)
    }

    /// Fetch vector statistics from the data plane.
    pub async fn describe_index_stats(
        &self,
        index: &IndexHandle,
    ) -> Result<IndexStats, PineconeError> {
        let response = self
            .data(Method::POST, index, "describe_index_stats")
            .json(&json!({}))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.failure(response, "Index stats request failed").await)
        }
    }

    /// Upsert a batch of vectors, returning the count acknowledged by Pinecone.
    pub async fn upsert(
        &self,
        index: &IndexHandle,
        vectors: &[VectorRecord],
    ) -> Result<usize, PineconeError> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let response = self
            .data(Method::POST, index, "vectors/upsert")
            .json(&json!({ "vectors": vectors }))
            .send()
            .await?;

        if response.status().is_success() {
            let UpsertResponse { upserted_count } = response.json().await?;
            tracing::debug!(index = %index.name, upserted_count, "Vectors upserted");
            Ok(upserted_count)
        } else {
            Err(self.failure(response, "Vector upsert failed").await)
        }
    }

    fn handle_for(&self, description: &IndexDescription) -> Result<IndexHandle, PineconeError> {
        let host = description
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                PineconeError::InvalidUrl(format!("index '{}' has no host", description.name))
            })?;
        Ok(IndexHandle {
            name: description.name.clone(),
            host: data_plane_url(host).map_err(PineconeError::InvalidUrl)?,
        })
    }

    fn control(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.authorized(method, format_endpoint(&self.controller_url, path))
    }

    fn data(&self, method: Method, index: &IndexHandle, path: &str) -> reqwest::RequestBuilder {
        self.authorized(method, format_endpoint(&index.host, path))
    }

    fn authorized(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn failure(&self, response: reqwest::Response, context: &'static str) -> PineconeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = PineconeError::UnexpectedStatus { status, body };
        tracing::error!(error = %error, "{context}");
        error
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

/// Hosted indexes report a bare hostname; local emulators report a full URL.
fn data_plane_url(host: &str) -> Result<String, String> {
    if host.starts_with("http://") || host.starts_with("https://") {
        normalize_base_url(host)
    } else {
        normalize_base_url(&format!("https://{host}"))
    }
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
