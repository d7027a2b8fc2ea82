//! Corpus store
//!
//! Source of truth for exact-id lookup and for the keyword indices.
//! Readers take an `Arc` snapshot of the current generation and score
//! without holding any lock; `rebuild` builds a complete new generation
//! off to the side and swaps it in atomically, so a concurrent reader
//! never observes a mixed state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use sherlock_core::Incident;
use sherlock_text_processing::tokenize;

use crate::bm25::Bm25Index;
use crate::persistence;
use crate::tfidf::TfidfIndex;
use crate::RetrievalError;

/// One immutable index generation
#[derive(Clone, Default)]
pub struct CorpusSnapshot {
    pub incidents: Arc<Vec<Incident>>,
    by_id: Arc<HashMap<String, usize>>,
    pub bm25: Option<Arc<Bm25Index>>,
    pub tfidf: Option<Arc<TfidfIndex>>,
}

impl CorpusSnapshot {
    fn from_parts(incidents: Vec<Incident>, bm25: Option<Bm25Index>, tfidf: Option<TfidfIndex>) -> Self {
        let by_id = incidents
            .iter()
            .enumerate()
            .map(|(index, incident)| (incident.canonical_id(), index))
            .collect();
        Self {
            incidents: Arc::new(incidents),
            by_id: Arc::new(by_id),
            bm25: bm25.map(Arc::new),
            tfidf: tfidf.map(Arc::new),
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&Incident> {
        self.by_id
            .get(&id.to_uppercase())
            .map(|&index| &self.incidents[index])
    }

    pub fn get(&self, index: usize) -> Option<&Incident> {
        self.incidents.get(index)
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// Index statistics for metrics and health reporting
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub corpus_size: usize,
    pub bm25_available: bool,
    pub bm25_vocab_size: usize,
    pub tfidf_available: bool,
    pub tfidf_features: usize,
    pub cache_files_exist: [bool; 3],
}

/// In-process incident table plus the keyword indices
pub struct CorpusStore {
    cache_dir: PathBuf,
    current: RwLock<CorpusSnapshot>,
}

impl CorpusStore {
    /// Open a store, hydrating from the disk cache when a consistent
    /// generation exists. Any inconsistency discards the cache and the
    /// store starts empty (semantic-only degraded mode) until rebuild.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let snapshot = match persistence::load_generation(&cache_dir) {
            Some((bm25, tfidf, incidents)) => {
                tracing::info!(
                    corpus_size = incidents.len(),
                    bm25_vocab = bm25.vocab_size(),
                    tfidf_features = tfidf.feature_count(),
                    "Hydrated index generation from disk cache"
                );
                CorpusSnapshot::from_parts(incidents, Some(bm25), Some(tfidf))
            }
            None => CorpusSnapshot::default(),
        };
        Self {
            cache_dir,
            current: RwLock::new(snapshot),
        }
    }

    /// Current generation; cheap Arc clones, no lock held afterwards
    pub fn snapshot(&self) -> CorpusSnapshot {
        self.current.read().clone()
    }

    /// Case-insensitive exact-id lookup
    pub fn by_id(&self, id: &str) -> Option<Incident> {
        self.current.read().by_id(id).cloned()
    }

    /// All incidents in the fixed per-generation order
    pub fn all(&self) -> Arc<Vec<Incident>> {
        self.current.read().incidents.clone()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Rebuild every index from scratch and persist the new generation.
    ///
    /// Incidents whose searchable text tokenizes to nothing are dropped so
    /// the indices and metadata stay aligned. The in-memory swap happens
    /// only after the build succeeds; persistence failures keep the new
    /// generation in memory and are reported to the caller.
    pub fn rebuild(&self, incidents: Vec<Incident>) -> Result<(), RetrievalError> {
        let mut kept = Vec::with_capacity(incidents.len());
        let mut tokenized = Vec::with_capacity(incidents.len());
        let mut searchable = Vec::with_capacity(incidents.len());

        for mut incident in incidents {
            incident.id = incident.canonical_id();
            let text = incident.searchable_text();
            let tokens = tokenize(&text);
            if tokens.is_empty() {
                tracing::warn!(id = %incident.id, "Skipping incident with no indexable text");
                continue;
            }
            tokenized.push(tokens);
            searchable.push(text);
            kept.push(incident);
        }

        let bm25 = Bm25Index::build(&tokenized);
        let tfidf = TfidfIndex::build(&searchable);

        let persist_result = persistence::save_generation(&self.cache_dir, &bm25, &tfidf, &kept);

        let corpus_size = kept.len();
        let snapshot = CorpusSnapshot::from_parts(kept, Some(bm25), Some(tfidf));
        *self.current.write() = snapshot;

        tracing::info!(corpus_size, "Corpus rebuilt");
        persist_result
    }

    /// Substring suggestions over titles and tags
    pub fn suggestions(&self, query: &str, max_suggestions: usize) -> Vec<String> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let snapshot = self.snapshot();
        let mut suggestions: Vec<String> = Vec::new();

        for incident in snapshot.incidents.iter() {
            let title = incident.title.to_lowercase();
            if title.contains(&query) && !suggestions.contains(&title) {
                suggestions.push(title);
                if suggestions.len() >= max_suggestions {
                    return suggestions;
                }
            }
        }
        for incident in snapshot.incidents.iter() {
            for tag in &incident.tags {
                let tag = tag.to_lowercase();
                if tag.contains(&query) && !suggestions.contains(&tag) {
                    suggestions.push(tag);
                    if suggestions.len() >= max_suggestions {
                        return suggestions;
                    }
                }
            }
        }
        suggestions
    }

    pub fn stats(&self) -> CorpusStats {
        let snapshot = self.snapshot();
        let (bm25_file, tfidf_file, metadata_file) =
            persistence::cache_files_exist(&self.cache_dir);
        CorpusStats {
            corpus_size: snapshot.len(),
            bm25_available: snapshot.bm25.is_some(),
            bm25_vocab_size: snapshot.bm25.as_ref().map(|i| i.vocab_size()).unwrap_or(0),
            tfidf_available: snapshot.tfidf.is_some(),
            tfidf_features: snapshot
                .tfidf
                .as_ref()
                .map(|i| i.feature_count())
                .unwrap_or(0),
            cache_files_exist: [bm25_file, tfidf_file, metadata_file],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: &str, title: &str, tags: &[&str]) -> Incident {
        Incident {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            resolution: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        }
    }

    #[test]
    fn test_open_without_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path());
        assert!(store.is_empty());
        assert!(store.by_id("JSP-1046").is_none());
    }

    #[test]
    fn test_rebuild_and_case_insensitive_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path());
        store
            .rebuild(vec![incident("jsp-1046", "Webhook signature mismatch", &["webhook"])])
            .unwrap();

        let found = store.by_id("JSP-1046").unwrap();
        assert_eq!(found.id, "JSP-1046");
        assert!(store.by_id("jsp-1046").is_some());
        assert!(store.by_id("JSP-9999").is_none());
    }

    #[test]
    fn test_rebuild_persists_and_rehydrates() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CorpusStore::open(dir.path());
            store
                .rebuild(vec![
                    incident("JSP-1", "UPI payment failed", &["upi"]),
                    incident("JSP-2", "Webhook signature mismatch", &["webhook"]),
                ])
                .unwrap();
        }
        let store = CorpusStore::open(dir.path());
        assert_eq!(store.len(), 2);
        assert!(store.snapshot().bm25.is_some());
        assert!(store.by_id("JSP-2").is_some());
    }

    #[test]
    fn test_rebuild_empty_corpus_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path());
        store.rebuild(Vec::new()).unwrap();
        assert!(store.is_empty());
        let snapshot = store.snapshot();
        assert!(snapshot.bm25.unwrap().is_empty());
    }

    #[test]
    fn test_suggestions() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path());
        store
            .rebuild(vec![
                incident("JSP-1", "UPI payment failed with error 5003", &["upi", "5003"]),
                incident("JSP-2", "Webhook signature mismatch", &["webhook"]),
            ])
            .unwrap();

        let suggestions = store.suggestions("upi", 5);
        assert!(suggestions.iter().any(|s| s.contains("upi payment failed")));
        assert!(store.suggestions("", 5).is_empty());
    }

    #[test]
    fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path());
        store
            .rebuild(vec![incident("JSP-1", "UPI payment failed", &[])])
            .unwrap();
        let stats = store.stats();
        assert_eq!(stats.corpus_size, 1);
        assert!(stats.bm25_available);
        assert!(stats.bm25_vocab_size > 0);
        assert_eq!(stats.cache_files_exist, [true, true, true]);
    }
}
