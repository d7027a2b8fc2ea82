//! In-memory backends
//!
//! Cosine-scan vector index and a TTL-aware byte cache. Used by tests and
//! as fallbacks when the external services are not configured.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use sherlock_core::{
    ChatModel, Embedder, EmbeddingRecord, Error, GenerationOptions, IndexStats, KvCache,
    MetadataFilter, Result, VectorIndex, VectorMatch,
};

/// Chat backend that fails every call.
///
/// Stands in when no working chat client can be built: the classifier
/// defaults to SIMPLE and the generator emits its deterministic fallback,
/// so the engine keeps serving instead of refusing to start.
pub struct DisabledChat;

#[async_trait]
impl ChatModel for DisabledChat {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
        Err(Error::Chat("chat backend disabled".to_string()))
    }

    fn model_name(&self) -> &str {
        "disabled"
    }
}

/// Brute-force cosine vector index
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<HashMap<String, EmbeddingRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests: embed and upsert a set of (id, text, metadata)
    pub async fn index_texts(
        &self,
        embedder: &dyn Embedder,
        items: &[(String, String, HashMap<String, String>)],
    ) -> Result<()> {
        let mut records = Vec::with_capacity(items.len());
        for (id, text, metadata) in items {
            records.push(EmbeddingRecord {
                id: id.clone(),
                vector: embedder.embed(text).await?,
                metadata: metadata.clone(),
            });
        }
        self.upsert(&records).await
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>> {
        let records = self.records.read();
        let mut matches: Vec<VectorMatch> = records
            .values()
            .filter(|record| filter.map(|f| f.matches(&record.metadata)).unwrap_or(true))
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: Self::cosine(vector, &record.vector).clamp(0.0, 1.0),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let mut store = self.records.write();
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let records = self.records.read();
        let dimension = records.values().next().map(|r| r.vector.len()).unwrap_or(0);
        Ok(IndexStats {
            count: records.len() as u64,
            dimension,
        })
    }
}

/// TTL-aware in-memory byte cache
#[derive(Default)]
pub struct InMemoryKvCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Option<Instant>)>>,
}

impl InMemoryKvCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvCache for InMemoryKvCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some((value, expires)) => {
                if expires.map(|at| at <= Instant::now()).unwrap_or(false) {
                    Ok(None)
                } else {
                    Ok(Some(value.clone()))
                }
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &[u8]) -> Result<()> {
        let expires = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| Error::Cache("TTL overflow".to_string()))?;
        self.entries
            .write()
            .insert(key.to_string(), (value.to_vec(), Some(expires)));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    #[tokio::test]
    async fn test_query_ranks_by_cosine() {
        let embedder = HashingEmbedder::new(128);
        let index = InMemoryVectorIndex::new();
        index
            .index_texts(
                &embedder,
                &[
                    (
                        "JSP-1".to_string(),
                        "upi payment failed with error 5003".to_string(),
                        HashMap::new(),
                    ),
                    (
                        "JSP-2".to_string(),
                        "webhook signature mismatch".to_string(),
                        HashMap::new(),
                    ),
                ],
            )
            .await
            .unwrap();

        let query = embedder.embed("upi error 5003").await.unwrap();
        let matches = index.query(&query, 2, None).await.unwrap();
        assert_eq!(matches[0].id, "JSP-1");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_metadata_filter_restricts_results() {
        let index = InMemoryVectorIndex::new();
        let mut upi = HashMap::new();
        upi.insert("domain".to_string(), "upi".to_string());
        let mut card = HashMap::new();
        card.insert("domain".to_string(), "card".to_string());

        index
            .upsert(&[
                EmbeddingRecord {
                    id: "A".to_string(),
                    vector: vec![1.0, 0.0],
                    metadata: upi,
                },
                EmbeddingRecord {
                    id: "B".to_string(),
                    vector: vec![1.0, 0.0],
                    metadata: card,
                },
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::new().eq("domain", "card");
        let matches = index.query(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "B");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryVectorIndex::new();
        let record = |v: f32| EmbeddingRecord {
            id: "A".to_string(),
            vector: vec![v, 0.0],
            metadata: HashMap::new(),
        };
        index.upsert(&[record(1.0)]).await.unwrap();
        index.upsert(&[record(0.5)]).await.unwrap();

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.count, 1);
    }

    #[tokio::test]
    async fn test_disabled_chat_always_errors() {
        let chat = DisabledChat;
        let result = chat
            .generate("anything", &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Chat(_))));
    }

    #[tokio::test]
    async fn test_kv_cache_roundtrip_and_expiry() {
        let cache = InMemoryKvCache::new();
        cache.set_ex("k", 3600, b"value").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(cache.get("missing").await.unwrap(), None);

        cache.set_ex("short", 0, b"gone").await.unwrap();
        assert_eq!(cache.get("short").await.unwrap(), None);
        cache.ping().await.unwrap();
    }
}
