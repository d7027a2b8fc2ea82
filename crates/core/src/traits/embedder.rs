//! Embedding model interface

use async_trait::async_trait;

use crate::Result;

/// Dense embedding backend
///
/// `embed_batch` has a default per-item loop; implementations with real
/// batching (bounded concurrency, zero-vector substitution on per-item
/// failure) override it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimension()` floats
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts; the default implementation is sequential
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Fixed output dimension of the model
    fn dimension(&self) -> usize;

    /// Model identifier, used in cache keys and logging
    fn model_id(&self) -> &str;
}
