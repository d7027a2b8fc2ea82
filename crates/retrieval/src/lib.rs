//! Corpus store, keyword indices, and hybrid retrieval
//!
//! Features:
//! - In-process corpus of incident metadata with O(1) id lookup
//! - Okapi BM25 index over the tokenized corpus
//! - TF-IDF vectorizer with 1-2-grams and capped vocabulary
//! - Atomic three-file disk cache (BM25 + TF-IDF + metadata as one generation)
//! - Hybrid retriever fanning out dense/BM25/TF-IDF concurrently, with
//!   min-max normalization, weighted fusion, exact-term and priority boosts

pub mod bm25;
pub mod corpus;
pub mod hybrid;
mod persistence;
pub mod tfidf;

pub use bm25::Bm25Index;
pub use corpus::{CorpusSnapshot, CorpusStats, CorpusStore};
pub use hybrid::{HybridConfig, HybridRetriever};
pub use tfidf::{TfidfIndex, TfidfVectorizer};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Cache persistence error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RetrievalError> for sherlock_core::Error {
    fn from(err: RetrievalError) -> Self {
        sherlock_core::Error::Retrieval(err.to_string())
    }
}
