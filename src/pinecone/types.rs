//! Shared types used by the Pinecone client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// Base URL or index host failed to parse.
    #[error("Invalid Pinecone URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Index did not reach the expected state before the deadline.
    #[error("Timed out waiting for index '{index}' to become {state}")]
    Timeout {
        /// Index being waited on.
        index: String,
        /// State that was expected.
        state: &'static str,
    },
}

/// Serverless placement used when creating an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerlessSpec {
    /// Cloud provider, e.g. `aws`.
    pub cloud: String,
    /// Cloud region, e.g. `us-east-1`.
    pub region: String,
}

/// Vector plus metadata as accepted by the upsert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    /// Stable identifier of the vector.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Metadata stored alongside the vector.
    pub metadata: Map<String, Value>,
}

/// Subset of the control-plane index description the services rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    /// Index name.
    pub name: String,
    /// Vector dimension declared at creation.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Similarity metric.
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host, without scheme for hosted indexes.
    #[serde(default)]
    pub host: Option<String>,
    /// Readiness information.
    #[serde(default)]
    pub status: IndexStatus,
}

impl IndexDescription {
    /// Whether the index is ready to accept data-plane requests.
    pub fn is_ready(&self) -> bool {
        self.status.ready && self.host.as_deref().is_some_and(|host| !host.is_empty())
    }
}

/// Readiness block of an index description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    /// True once the index serves traffic.
    #[serde(default)]
    pub ready: bool,
    /// Lifecycle state such as `Initializing` or `Ready`.
    #[serde(default)]
    pub state: Option<String>,
}

/// Data-plane statistics returned by `describe_index_stats`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Dimension of the stored vectors.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Number of vectors across all namespaces.
    #[serde(default)]
    pub total_vector_count: u64,
}

/// Index ready for upserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    /// Index name.
    pub name: String,
    /// Fully-qualified data-plane base URL.
    pub host: String,
}

#[derive(Deserialize)]
pub(crate) struct ListIndexesResponse {
    #[serde(default)]
    pub(crate) indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertResponse {
    #[serde(default)]
    pub(crate) upserted_count: usize,
}
