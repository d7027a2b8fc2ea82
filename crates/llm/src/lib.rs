//! External model clients
//!
//! Features:
//! - Gemini chat backend over HTTP with bounded retries and backoff
//! - Embedding client with K/V caching, TTL, and bounded batch concurrency
//! - Qdrant vector index client
//! - Deterministic hashing embedder as a dependency-free fallback
//! - In-memory vector index and K/V cache for tests and degraded mode
//! - Redis K/V cache

pub mod backend;
pub mod cache;
pub mod embeddings;
pub mod memory;
pub mod vector_store;

pub use backend::{GeminiChat, GeminiConfig};
pub use cache::RedisCache;
pub use embeddings::{EmbeddingClient, GeminiEmbedder, HashingEmbedder};
pub use memory::{DisabledChat, InMemoryKvCache, InMemoryVectorIndex};
pub use vector_store::{QdrantConfig, QdrantIndex};

use thiserror::Error;

/// Client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for sherlock_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::VectorStore(msg) => sherlock_core::Error::VectorIndex(msg),
            LlmError::Cache(msg) => sherlock_core::Error::Cache(msg),
            LlmError::Configuration(msg) => sherlock_core::Error::Config(msg),
            other => sherlock_core::Error::Chat(other.to_string()),
        }
    }
}
