//! Query complexity classifier
//!
//! Asks the chat model for one of `simple | complex | unknown` with a tiny
//! token budget, caches decisions in a bounded LRU keyed by the lowercased
//! trimmed query, and defaults to SIMPLE on any failure (narrower retrieval
//! is the safe direction).

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use sherlock_config::constants::{cache, generation};
use sherlock_core::{ChatModel, GenerationOptions, QueryComplexity};

const CLASSIFICATION_PROMPT: &str = r#"Classify this technical query for retrieval routing:

QUERY: "{query}"

CLASSIFICATION OPTIONS:
- simple: Can be answered with 1-2 specific incidents (e.g., "UPI timeout error 5003", "Card tokenization failing")
- complex: Needs analysis of multiple incidents or patterns (e.g., "Why do refunds fail?", "Root cause of payment timeouts")
- unknown: Likely no relevant incidents in the payment domain (e.g., "How to deploy a service?", "Database schema design")

EXAMPLES:
- "UPI payment failed with error 5003" -> simple
- "Webhook delivery keeps failing" -> simple
- "What causes most payment failures?" -> complex
- "How to optimize payment success rates?" -> complex
- "How to set up monitoring?" -> unknown

Answer only with: simple, complex, or unknown"#;

/// Chat-backed classifier with a bounded decision cache
pub struct QueryClassifier {
    chat: Arc<dyn ChatModel>,
    cache: Mutex<LruCache<String, QueryComplexity>>,
}

impl QueryClassifier {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        // CLASSIFIER_CAPACITY is a non-zero constant
        let capacity = NonZeroUsize::new(cache::CLASSIFIER_CAPACITY)
            .unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            chat,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Classify a query; never fails
    pub async fn classify(&self, query: &str) -> QueryComplexity {
        let cache_key = query.trim().to_lowercase();
        if let Some(&complexity) = self.cache.lock().get(&cache_key) {
            return complexity;
        }

        let prompt = CLASSIFICATION_PROMPT.replace("{query}", query);
        let options = GenerationOptions::new(
            generation::CLASSIFIER_TEMPERATURE,
            generation::CLASSIFIER_MAX_TOKENS,
        );

        let complexity = match self.chat.generate(&prompt, &options).await {
            Ok(raw) => {
                let complexity = Self::parse(&raw);
                tracing::info!(
                    query,
                    complexity = %complexity,
                    raw_classification = %raw,
                    "Query classified"
                );
                complexity
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Classification failed, defaulting to simple");
                QueryComplexity::Simple
            }
        };

        self.cache.lock().put(cache_key, complexity);
        complexity
    }

    /// Substring mapping over the raw model reply
    fn parse(raw: &str) -> QueryComplexity {
        let raw = raw.trim().to_lowercase();
        if raw.contains("simple") {
            QueryComplexity::Simple
        } else if raw.contains("complex") {
            QueryComplexity::Complex
        } else {
            QueryComplexity::Unknown
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Distribution of cached decisions (simple, complex, unknown)
    pub fn complexity_distribution(&self) -> (usize, usize, usize) {
        let cache = self.cache.lock();
        let mut counts = (0, 0, 0);
        for (_, complexity) in cache.iter() {
            match complexity {
                QueryComplexity::Simple => counts.0 += 1,
                QueryComplexity::Complex => counts.1 += 1,
                QueryComplexity::Unknown => counts.2 += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sherlock_core::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedChat {
        reply: String,
        calls: AtomicUsize,
    }

    impl ScriptedChat {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatModel for FailingChat {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            Err(sherlock_core::Error::Chat("down".to_string()))
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_parse_variants() {
        assert_eq!(QueryClassifier::parse("simple"), QueryComplexity::Simple);
        assert_eq!(QueryClassifier::parse(" Complex\n"), QueryComplexity::Complex);
        assert_eq!(
            QueryClassifier::parse("this is a complex query"),
            QueryComplexity::Complex
        );
        assert_eq!(QueryClassifier::parse("no idea"), QueryComplexity::Unknown);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_model() {
        let chat = ScriptedChat::new("complex");
        let classifier = QueryClassifier::new(chat.clone());

        assert_eq!(
            classifier.classify("Why do refunds fail?").await,
            QueryComplexity::Complex
        );
        // Same query modulo case/whitespace hits the cache
        assert_eq!(
            classifier.classify("  why do refunds FAIL?  ").await,
            QueryComplexity::Complex
        );
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
        assert_eq!(classifier.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_failure_defaults_to_simple() {
        let classifier = QueryClassifier::new(Arc::new(FailingChat));
        assert_eq!(
            classifier.classify("upi timeout").await,
            QueryComplexity::Simple
        );
    }

    #[tokio::test]
    async fn test_distribution() {
        let classifier = QueryClassifier::new(ScriptedChat::new("simple"));
        classifier.classify("a payment issue").await;
        classifier.classify("another payment issue").await;
        let (simple, complex, unknown) = classifier.complexity_distribution();
        assert_eq!((simple, complex, unknown), (2, 0, 0));
    }
}
