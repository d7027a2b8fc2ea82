//! Vector index interface

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One stored embedding: `(id, vector, metadata)`.
///
/// Every incident has exactly one record sharing its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A nearest-neighbor hit
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    /// Cosine similarity clamped into [0, 1]
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Index statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    pub count: u64,
    pub dimension: usize,
}

/// Equality filter over record metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub equals: HashMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.equals
            .iter()
            .all(|(k, v)| metadata.get(k).map(|m| m == v).unwrap_or(false))
    }
}

/// Approximate-nearest-neighbor store
///
/// Implementations return at most `top_k` matches sorted by descending score.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-k nearest neighbors with an optional metadata equality filter
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>>;

    /// Insert or replace records by id
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()>;

    async fn stats(&self) -> Result<IndexStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_filter() {
        let mut metadata = HashMap::new();
        metadata.insert("domain".to_string(), "upi".to_string());
        metadata.insert("source".to_string(), "jira".to_string());

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().eq("domain", "upi").matches(&metadata));
        assert!(!MetadataFilter::new().eq("domain", "card").matches(&metadata));
        assert!(!MetadataFilter::new().eq("missing", "x").matches(&metadata));
    }
}
