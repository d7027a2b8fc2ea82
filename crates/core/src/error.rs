//! Shared error type
//!
//! Crate-local errors (`RetrievalError`, `LlmError`, `RagError`, ...) convert
//! into this type at crate boundaries. Nothing inside the pipeline is allowed
//! to escape past the orchestrator; see the `rag_strategy` labels there.

use thiserror::Error;

/// Top-level error for the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Chat model error: {0}")]
    Chat(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Convenience result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;
