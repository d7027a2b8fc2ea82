//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{cache, endpoints};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// External model services (chat + embeddings)
    #[serde(default)]
    pub models: ModelConfig,

    /// Vector index (Qdrant)
    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    /// Disk and K/V caches
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8087
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chat model used by the classifier and the generator
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Embedding model
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    /// Embedding dimension fixed by the model
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// API key; usually supplied via SHERLOCK_MODELS__API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_chat_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_embed_model() -> String {
    "text-embedding-004".to_string()
}

fn default_embedding_dim() -> usize {
    768
}

fn default_model_endpoint() -> String {
    endpoints::GEMINI_DEFAULT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embed_model: default_embed_model(),
            embedding_dim: default_embedding_dim(),
            api_key: String::new(),
            endpoint: default_model_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default = "default_qdrant_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}

fn default_collection() -> String {
    "payment_incidents".to_string()
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_qdrant_endpoint(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the BM25/TF-IDF/metadata generation
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Redis URL for the embedding cache; in-memory fallback when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_embedding_ttl")]
    pub embedding_ttl_secs: u64,
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

fn default_embedding_ttl() -> u64 {
    cache::EMBEDDING_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            redis_url: None,
            embedding_ttl_secs: default_embedding_ttl(),
        }
    }
}

/// Retrieval tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Bounded concurrency for batch embedding calls
    #[serde(default = "default_max_concurrent_embeddings")]
    pub max_concurrent_embeddings: usize,
}

fn default_max_concurrent_embeddings() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_concurrent_embeddings: default_max_concurrent_embeddings(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings, rejecting values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.embedding_dim == 0 {
            return Err(ConfigError::InvalidValue {
                field: "models.embedding_dim".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.retrieval.max_concurrent_embeddings == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.max_concurrent_embeddings".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.models.api_key.is_empty() && self.environment.is_production() {
            return Err(ConfigError::InvalidValue {
                field: "models.api_key".to_string(),
                message: "required in production".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if Path::new("config/default.yaml").exists() {
        builder = builder.add_source(File::with_name("config/default"));
    }
    if let Some(env_name) = env {
        let env_file = format!("config/{env_name}");
        if Path::new(&format!("{env_file}.yaml")).exists() {
            builder = builder.add_source(File::with_name(&env_file));
        } else {
            tracing::warn!(env = env_name, "Environment config file not found");
        }
    }

    builder = builder.add_source(Environment::with_prefix("SHERLOCK").separator("__"));

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8087);
        assert_eq!(settings.models.embedding_dim, 768);
        assert_eq!(settings.retrieval.max_concurrent_embeddings, 10);
        assert_eq!(settings.cache.dir, "cache");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dim() {
        let mut settings = Settings::default();
        settings.models.embedding_dim = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_requires_api_key_in_production() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate().is_err());
        settings.models.api_key = "key".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_yaml_section_parses() {
        let yaml = r#"
server:
  port: 9090
models:
  chat_model: gemini-1.5-pro
cache:
  redis_url: redis://localhost:6379
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.models.chat_model, "gemini-1.5-pro");
        assert_eq!(
            settings.cache.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        // Untouched sections keep defaults
        assert_eq!(settings.models.embed_model, "text-embedding-004");
    }
}
