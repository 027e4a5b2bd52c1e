use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by the ingestion gateway and the embedding service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub host: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Deployment environment, which toggles logging and middleware strictness.
    pub environment: Environment,
    /// Raw `LOG_LEVEL` value; interpreted by [`crate::logging`].
    pub log_level: String,
    /// Embedding backend settings.
    pub embedding: EmbeddingConfig,
    /// Pinecone settings, present only when key, environment, and index name are all set.
    pub pinecone: Option<PineconeConfig>,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk.
    pub chunk_overlap: usize,
    /// Vectors sent per upsert request.
    pub upsert_batch_size: usize,
    /// Origins allowed by CORS in production.
    pub cors_origins: Vec<String>,
    /// Host patterns accepted in production.
    pub trusted_hosts: Vec<String>,
}

/// Deployment environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Local development: permissive middleware, verbose logs.
    Development,
    /// Production: configured CORS and trusted hosts, quiet logs.
    Production,
}

impl Environment {
    /// Short label used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Production => "prod",
        }
    }

    /// Whether this is the production environment.
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local sentence-transformer executed with ONNX Runtime.
    Onnx,
    /// Embeddings served by an Ollama runtime.
    Ollama,
    /// Deterministic hashed vectors for offline runs.
    Hash,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onnx" | "local" | "sentence-transformers" => Ok(Self::Onnx),
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Settings for the embedding backend.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Selected provider.
    pub provider: EmbeddingProvider,
    /// Short model name, e.g. `all-MiniLM-L6-v2`.
    pub model: String,
    /// Expected vector dimensionality.
    pub dimension: usize,
    /// Optional directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: Option<String>,
    /// Texts per inference call.
    pub batch_size: usize,
    /// Ollama base URL.
    pub ollama_url: String,
}

impl EmbeddingConfig {
    /// Hugging Face repository id of the configured model.
    pub fn qualified_model_name(&self) -> String {
        if self.model.contains('/') {
            self.model.clone()
        } else {
            format!("sentence-transformers/{}", self.model)
        }
    }
}

/// Credentials and placement for the Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key sent as the `Api-Key` header.
    pub api_key: String,
    /// Legacy environment name; only gates storage and is logged.
    pub environment: String,
    /// Normalized index name.
    pub index_name: String,
    /// Serverless cloud used when creating the index.
    pub cloud: String,
    /// Serverless region used when creating the index.
    pub region: String,
    /// Control-plane base URL.
    pub controller_url: String,
    /// Seconds to wait for a freshly created index to report ready.
    pub ready_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match load_env_optional("ENVIRONMENT") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("ENVIRONMENT".into()))?,
            None => Environment::Development,
        };

        let embedding = EmbeddingConfig {
            provider: match load_env_optional("EMBEDDING_PROVIDER") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?,
                None => EmbeddingProvider::Onnx,
            },
            model: load_env_or("DEFAULT_MODEL", "all-MiniLM-L6-v2"),
            dimension: parse_env("EMBEDDING_DIMENSION", 384)?,
            model_dir: load_env_optional("EMBEDDING_MODEL_DIR"),
            batch_size: parse_env::<usize>("EMBEDDING_BATCH_SIZE", 32)?.max(1),
            ollama_url: load_env_or("OLLAMA_URL", "http://127.0.0.1:11434"),
        };

        Ok(Self {
            host: load_env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 8000)?,
            environment,
            log_level: load_env_or("LOG_LEVEL", "info"),
            embedding,
            pinecone: load_pinecone_config()?,
            chunk_size: parse_env("TEXT_SPLITTER_CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_env("TEXT_SPLITTER_CHUNK_OVERLAP", 100)?,
            upsert_batch_size: parse_env::<usize>("UPSERT_BATCH_SIZE", 100)?.max(1),
            cors_origins: parse_list(&load_env_or("CORS_ORIGINS", "*")),
            trusted_hosts: parse_list(&load_env_or("TRUSTED_HOSTS", "*")),
        })
    }
}

fn load_pinecone_config() -> Result<Option<PineconeConfig>, ConfigError> {
    let api_key = load_env_optional("PINECONE_API_KEY");
    let environment = load_env_optional("PINECONE_ENVIRONMENT");
    let index_name = load_env_optional("INDEX_NAME")
        .map(|raw| normalize_index_name(&raw))
        .filter(|name| !name.is_empty());

    let (Some(api_key), Some(environment), Some(index_name)) = (api_key, environment, index_name)
    else {
        return Ok(None);
    };

    Ok(Some(PineconeConfig {
        api_key,
        environment,
        index_name,
        cloud: load_env_or("PINECONE_CLOUD", "aws"),
        region: load_env_or("PINECONE_REGION", "us-east-1"),
        controller_url: load_env_or("PINECONE_CONTROLLER_URL", "https://api.pinecone.io"),
        ready_timeout_secs: parse_env("PINECONE_READY_TIMEOUT_SECS", 60)?,
    }))
}

/// Normalize an index name to Pinecone's accepted alphabet: lowercase ASCII, digits, and hyphens.
pub fn normalize_index_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace([' ', '_'], "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Parse list-valued settings given as `*`, a JSON array, or a comma-separated string.
pub fn parse_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed == "*" {
        return vec!["*".to_string()];
    }
    if trimmed.starts_with('[')
        && trimmed.ends_with(']')
        && let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed)
    {
        return values;
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}
