//! Traits for pluggable backends
//!
//! The engine talks to the outside world (chat model, embedding model,
//! vector index, K/V cache) only through these narrow interfaces.

pub mod cache;
pub mod chat;
pub mod embedder;
pub mod vector;

pub use cache::KvCache;
pub use chat::{ChatModel, GenerationOptions};
pub use embedder::Embedder;
pub use vector::{EmbeddingRecord, IndexStats, MetadataFilter, VectorIndex, VectorMatch};
