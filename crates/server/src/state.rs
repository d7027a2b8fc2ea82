//! Application state
//!
//! Wires settings to concrete backends. The dense backend and the Redis
//! cache are optional: when they are unreachable or unconfigured the engine
//! runs lexical-only with an in-memory cache instead of refusing to start.

use std::sync::Arc;
use std::time::Duration;

use sherlock_config::Settings;
use sherlock_core::{ChatModel, Embedder, KvCache, VectorIndex};
use sherlock_llm::{
    DisabledChat, EmbeddingClient, GeminiChat, GeminiConfig, GeminiEmbedder, HashingEmbedder,
    InMemoryKvCache, QdrantConfig, QdrantIndex, RedisCache,
};
use sherlock_rag::RagService;
use sherlock_retrieval::{CorpusStore, HybridConfig, HybridRetriever};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<RagService>,
}

impl AppState {
    /// Build the full service graph from settings
    pub async fn from_settings(settings: Settings) -> Self {
        let gemini_config = GeminiConfig {
            api_key: settings.models.api_key.clone(),
            chat_model: settings.models.chat_model.clone(),
            embed_model: settings.models.embed_model.clone(),
            embedding_dim: settings.models.embedding_dim,
            endpoint: settings.models.endpoint.clone(),
            timeout: Duration::from_secs(settings.models.timeout_secs),
            max_retries: settings.models.max_retries,
            ..Default::default()
        };

        let chat: Arc<dyn ChatModel> = match GeminiChat::new(gemini_config.clone()) {
            Ok(chat) => Arc::new(chat),
            Err(e) => {
                // Classifier and generator both degrade deterministically
                // when calls fail, so an always-erroring chat backend keeps
                // the engine serving instead of aborting startup.
                tracing::error!(error = %e, "Chat client construction failed, chat disabled");
                Arc::new(DisabledChat)
            }
        };

        let cache: Arc<dyn KvCache> = match &settings.cache.redis_url {
            Some(url) => match RedisCache::connect(url).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, using in-memory cache");
                    Arc::new(InMemoryKvCache::new())
                }
            },
            None => Arc::new(InMemoryKvCache::new()),
        };

        let remote_embedder: Arc<dyn Embedder> = if settings.models.api_key.is_empty() {
            tracing::warn!("No model API key configured, using hashing fallback embedder");
            Arc::new(HashingEmbedder::new(settings.models.embedding_dim))
        } else {
            match GeminiEmbedder::new(gemini_config) {
                Ok(embedder) => Arc::new(embedder),
                Err(e) => {
                    tracing::warn!(error = %e, "Embedder construction failed, using hashing fallback");
                    Arc::new(HashingEmbedder::new(settings.models.embedding_dim))
                }
            }
        };
        let embedder: Arc<dyn Embedder> = Arc::new(
            EmbeddingClient::new(remote_embedder, settings.retrieval.max_concurrent_embeddings)
                .with_cache(cache, settings.cache.embedding_ttl_secs),
        );

        let vector_index: Option<Arc<dyn VectorIndex>> = {
            let config = QdrantConfig {
                endpoint: settings.vector_index.endpoint.clone(),
                collection: settings.vector_index.collection.clone(),
                dimension: settings.models.embedding_dim,
                api_key: settings.vector_index.api_key.clone(),
            };
            match QdrantIndex::new(config) {
                Ok(index) => match index.ensure_collection().await {
                    Ok(()) => Some(Arc::new(index) as Arc<dyn VectorIndex>),
                    Err(e) => {
                        tracing::warn!(error = %e, "Qdrant unreachable, running lexical-only");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Qdrant client construction failed, running lexical-only");
                    None
                }
            }
        };

        let corpus = Arc::new(CorpusStore::open(&settings.cache.dir));

        let mut retriever = HybridRetriever::new(corpus.clone(), HybridConfig::default());
        if let Some(index) = &vector_index {
            retriever = retriever.with_dense(embedder.clone(), index.clone());
        }
        let retriever = Arc::new(retriever);

        let mut service = RagService::new(chat, corpus, retriever);
        if let Some(index) = vector_index {
            service = service.with_dense_backend(embedder, index);
        }

        Self {
            settings: Arc::new(settings),
            service: Arc::new(service),
        }
    }
}
