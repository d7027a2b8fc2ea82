//! Embedding clients
//!
//! `GeminiEmbedder` calls the external embedding model; `EmbeddingClient`
//! layers K/V caching and bounded-concurrency batching on top of any
//! embedder; `HashingEmbedder` is a deterministic dependency-free fallback
//! used in tests and when no model service is configured.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use sherlock_core::{Embedder, Error, KvCache, Result};

use crate::backend::GeminiConfig;
use crate::LlmError;

/// Remote embedder over the Gemini `embedContent` API
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> std::result::Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.config.endpoint, self.config.embed_model, self.config.api_key
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.config.embed_model),
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
        };

        let response = self
            .client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from)
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("{status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;
        Ok(parsed.embedding.values)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    fn model_id(&self) -> &str {
        &self.config.embed_model
    }
}

/// Deterministic bag-of-tokens hashing embedder.
///
/// Tokens are FNV-1a hashed into a fixed number of buckets and the result
/// is L2-normalized, so overlapping texts land close in cosine space. Not a
/// language model; good enough to keep dense retrieval ranked sensibly when
/// no embedding service is available, and fully reproducible for tests.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (Self::fnv1a(token) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hashing-fallback"
    }
}

/// Caching, batching front for an embedder.
///
/// Single embeds go through the K/V cache keyed by a hash of
/// `model_id:text` with a TTL. Batch embeds run with bounded concurrency
/// and substitute a zero vector for failing elements so a batch never
/// fails atomically.
pub struct EmbeddingClient {
    inner: Arc<dyn Embedder>,
    cache: Option<Arc<dyn KvCache>>,
    ttl_secs: u64,
    semaphore: Arc<Semaphore>,
}

impl EmbeddingClient {
    pub fn new(inner: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        Self {
            inner,
            cache: None,
            ttl_secs: sherlock_config::constants::cache::EMBEDDING_TTL_SECS,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn KvCache>, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.ttl_secs = ttl_secs;
        self
    }

    fn cache_key(&self, text: &str) -> String {
        let content = format!("{}:{}", self.inner.model_id(), text);
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes());
        format!("embedding:{digest}")
    }

    async fn cache_get(&self, key: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    tracing::warn!(error = %e, "Cached embedding undecodable, ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Embedding cache read failed, proceeding without");
                None
            }
        }
    }

    async fn cache_put(&self, key: &str, vector: &[f32]) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match serde_json::to_vec(vector) {
            Ok(bytes) => {
                if let Err(e) = cache.set_ex(key, self.ttl_secs, &bytes).await {
                    tracing::warn!(error = %e, "Embedding cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Embedding serialization failed"),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.cache_key(text);
        if let Some(vector) = self.cache_get(&key).await {
            tracing::debug!(key = %key, "Embedding cache hit");
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        self.cache_put(&key, &vector).await;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let futures = texts.iter().map(|text| {
            let semaphore = self.semaphore.clone();
            async move {
                // Semaphore only closes on explicit close(), which never happens
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                self.embed(text).await
            }
        });

        let results = futures::future::join_all(futures).await;
        let dimension = self.inner.dimension();

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Batch embed element failed, substituting zero vector");
                    vec![0.0; dimension]
                }
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_hashing_embedder_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("upi payment failed").await.unwrap();
        let b = embedder.embed("upi payment failed").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_embedder_overlap_scores_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed("webhook signature mismatch").await.unwrap();
        let close = embedder
            .embed("webhook signature mismatch on callback")
            .await
            .unwrap();
        let far = embedder.embed("refund settlement delayed").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&query, &close) > dot(&query, &far));
    }

    /// Counts upstream calls so cache hits are observable
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_id(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_cache_prevents_second_upstream_call() {
        let counting = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let client = EmbeddingClient::new(counting.clone(), 4)
            .with_cache(Arc::new(InMemoryKvCache::new()), 60);

        client.embed("upi timeout").await.unwrap();
        client.embed("upi timeout").await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    /// Fails on a specific text to exercise zero-vector substitution
    struct FlakyEmbedder;

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text == "bad" {
                Err(Error::Embedding("boom".to_string()))
            } else {
                Ok(vec![1.0, 1.0, 1.0])
            }
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_batch_substitutes_zero_vector_on_failure() {
        let client = EmbeddingClient::new(Arc::new(FlakyEmbedder), 2);
        let vectors = client
            .embed_batch(&["ok".to_string(), "bad".to_string(), "ok".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![1.0, 1.0, 1.0]);
        assert_eq!(vectors[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(vectors[2], vec![1.0, 1.0, 1.0]);
    }
}
