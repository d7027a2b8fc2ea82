//! Core traits and types for the incident RAG engine
//!
//! This crate provides foundational types used across all other crates:
//! - The `Incident` record and its derived searchable text
//! - The `RagResponse` family returned by the query pipeline
//! - Core traits for pluggable backends (chat, embeddings, vector index, K/V cache)
//! - Error types

pub mod error;
pub mod incident;
pub mod response;
pub mod traits;

pub use error::{Error, Result};
pub use incident::{ErrorPattern, Incident};
pub use response::{
    MatchType, QueryComplexity, RagResponse, RagStrategy, RetrievedIncident, SearchMethod,
};
pub use traits::{
    ChatModel, Embedder, EmbeddingRecord, GenerationOptions, IndexStats, KvCache, MetadataFilter,
    VectorIndex, VectorMatch,
};
