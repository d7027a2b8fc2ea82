//! Hybrid retriever
//!
//! Fans out dense, BM25, and TF-IDF sub-searches concurrently, min-max
//! normalizes each method's scores, fuses them with fixed weights, then
//! applies exact-term, merchant/gateway priority, exact-title, and
//! multi-method agreement boosts. A failing or timed-out sub-search is
//! treated as empty; the retriever itself never fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use sherlock_config::constants::{boosts, fusion, retrieval};
use sherlock_core::{
    Embedder, Incident, MatchType, RetrievedIncident, SearchMethod, VectorIndex, VectorMatch,
};
use sherlock_text_processing::{
    exact_technical_terms, extract_merchant_id, extract_payment_gateway, query_entities, tokenize,
};

use crate::corpus::{CorpusSnapshot, CorpusStore};

static LEXICAL_MISSING_WARNED: Once = Once::new();

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Weight of the dense score in fusion
    pub semantic_weight: f32,
    /// Weight of the BM25 score in fusion
    pub bm25_weight: f32,
    /// Weight of the TF-IDF score in fusion
    pub tfidf_weight: f32,
    /// Sub-searches fetch top_k times this many candidates
    pub candidate_multiplier: usize,
    /// Dense similarity floor applied before fusion
    pub semantic_floor: f32,
    /// Per-sub-search timeout; a timeout is an empty result, not an error
    pub search_timeout: Duration,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            semantic_weight: fusion::SEMANTIC_WEIGHT,
            bm25_weight: fusion::BM25_WEIGHT,
            tfidf_weight: fusion::TFIDF_WEIGHT,
            candidate_multiplier: retrieval::CANDIDATE_MULTIPLIER,
            semantic_floor: retrieval::SEMANTIC_FLOOR,
            search_timeout: Duration::from_secs(10),
        }
    }
}

/// Hybrid retriever over the corpus and an optional dense backend
pub struct HybridRetriever {
    corpus: Arc<CorpusStore>,
    embedder: Option<Arc<dyn Embedder>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    config: HybridConfig,
}

struct FusionGroup {
    incident: Incident,
    semantic: f32,
    bm25: f32,
    tfidf: f32,
    methods: Vec<SearchMethod>,
}

impl HybridRetriever {
    pub fn new(corpus: Arc<CorpusStore>, config: HybridConfig) -> Self {
        Self {
            corpus,
            embedder: None,
            vector_index: None,
            config,
        }
    }

    /// Attach the dense backend (embedder + vector index)
    pub fn with_dense(
        mut self,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.vector_index = Some(vector_index);
        self
    }

    /// Run all three sub-searches, fuse, boost, rerank.
    ///
    /// Output is sorted by descending fused score with deterministic
    /// tie-breaks (method count desc, then id asc), filtered by
    /// `min_score`, truncated to `top_k`.
    pub async fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Vec<RetrievedIncident> {
        let fetch = top_k.saturating_mul(self.config.candidate_multiplier).max(1);
        let snapshot = self.corpus.snapshot();

        let semantic_future = self.semantic_search(query, fetch, &snapshot);

        let bm25_snapshot = snapshot.clone();
        let query_tokens = tokenize(query);
        let bm25_future = tokio::task::spawn_blocking(move || {
            Self::bm25_search(&bm25_snapshot, &query_tokens, fetch)
        });

        let tfidf_snapshot = snapshot.clone();
        let query_owned = query.to_string();
        let tfidf_future = tokio::task::spawn_blocking(move || {
            Self::tfidf_search(&tfidf_snapshot, &query_owned, fetch)
        });

        let (semantic_hits, bm25_joined, tfidf_joined) =
            tokio::join!(semantic_future, bm25_future, tfidf_future);

        let bm25_hits = bm25_joined.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "BM25 scoring task failed");
            Vec::new()
        });
        let tfidf_hits = tfidf_joined.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "TF-IDF scoring task failed");
            Vec::new()
        });

        if semantic_hits.is_empty() && bm25_hits.is_empty() && tfidf_hits.is_empty() {
            tracing::warn!(query, "No results from any search method");
            return Vec::new();
        }

        let results = self.fuse(query, semantic_hits, bm25_hits, tfidf_hits);

        let mut results: Vec<RetrievedIncident> = results
            .into_iter()
            .filter(|r| r.fused_score >= min_score)
            .collect();
        results.truncate(top_k);

        tracing::info!(
            query,
            final_count = results.len(),
            top_score = results.first().map(|r| r.fused_score).unwrap_or(0.0),
            "Hybrid search completed"
        );
        results
    }

    /// Dense sub-search: embed the query, then nearest-neighbor lookup.
    /// Missing backends, failures, and timeouts all yield an empty set.
    async fn semantic_search(
        &self,
        query: &str,
        fetch: usize,
        snapshot: &CorpusSnapshot,
    ) -> Vec<(Incident, f32)> {
        let (Some(embedder), Some(vector_index)) = (&self.embedder, &self.vector_index) else {
            tracing::debug!("Dense backend not configured, skipping semantic search");
            return Vec::new();
        };

        let floor = self.config.semantic_floor;
        let search = async {
            let vector = embedder.embed(query).await?;
            vector_index.query(&vector, fetch, None).await
        };

        let matches = match tokio::time::timeout(self.config.search_timeout, search).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Semantic search failed, continuing without it");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!("Semantic search timed out, continuing without it");
                return Vec::new();
            }
        };

        matches
            .into_iter()
            .filter(|m| m.score >= floor)
            .filter_map(|m| Self::resolve_match(snapshot, m))
            .collect()
    }

    /// Map a vector hit to an incident: the corpus wins, vector payload
    /// metadata covers semantic-only degraded mode.
    fn resolve_match(snapshot: &CorpusSnapshot, m: VectorMatch) -> Option<(Incident, f32)> {
        if let Some(incident) = snapshot.by_id(&m.id) {
            return Some((incident.clone(), m.score));
        }
        let title = m.metadata.get("title")?.clone();
        let get = |key: &str| m.metadata.get(key).cloned().unwrap_or_default();
        Some((
            Incident {
                id: m.id.to_uppercase(),
                title,
                description: get("description"),
                resolution: get("resolution"),
                tags: m
                    .metadata
                    .get("tags")
                    .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
                created_at: get("created_at"),
                resolved_by: get("resolved_by"),
                error_patterns: None,
            },
            m.score,
        ))
    }

    fn bm25_search(
        snapshot: &CorpusSnapshot,
        query_tokens: &[String],
        fetch: usize,
    ) -> Vec<(Incident, f32)> {
        let Some(bm25) = &snapshot.bm25 else {
            LEXICAL_MISSING_WARNED.call_once(|| {
                tracing::warn!("Keyword indices not built, running dense-only retrieval");
            });
            return Vec::new();
        };
        bm25.top_k(query_tokens, fetch)
            .into_iter()
            .filter_map(|(index, score)| {
                snapshot.get(index).map(|i| (i.clone(), score as f32))
            })
            .collect()
    }

    fn tfidf_search(snapshot: &CorpusSnapshot, query: &str, fetch: usize) -> Vec<(Incident, f32)> {
        let Some(tfidf) = &snapshot.tfidf else {
            return Vec::new();
        };
        tfidf
            .top_k(query, fetch, retrieval::TFIDF_MIN_COSINE)
            .into_iter()
            .filter_map(|(index, score)| {
                snapshot.get(index).map(|i| (i.clone(), score as f32))
            })
            .collect()
    }

    /// Min-max normalize one method's scores into [0, 1] in place.
    /// A constant score set normalizes to all 1.0.
    fn normalize(hits: &mut [(Incident, f32)]) {
        if hits.is_empty() {
            return;
        }
        let min = hits.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
        let max = hits.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
        if (max - min).abs() < f32::EPSILON {
            for (_, score) in hits.iter_mut() {
                *score = 1.0;
            }
        } else {
            for (_, score) in hits.iter_mut() {
                *score = (*score - min) / (max - min);
            }
        }
    }

    fn fuse(
        &self,
        query: &str,
        mut semantic: Vec<(Incident, f32)>,
        mut bm25: Vec<(Incident, f32)>,
        mut tfidf: Vec<(Incident, f32)>,
    ) -> Vec<RetrievedIncident> {
        Self::normalize(&mut semantic);
        Self::normalize(&mut bm25);
        Self::normalize(&mut tfidf);

        let mut groups: HashMap<String, FusionGroup> = HashMap::new();
        let mut merge = |hits: Vec<(Incident, f32)>, method: SearchMethod| {
            for (incident, score) in hits {
                let group = groups
                    .entry(incident.canonical_id())
                    .or_insert_with(|| FusionGroup {
                        incident,
                        semantic: 0.0,
                        bm25: 0.0,
                        tfidf: 0.0,
                        methods: Vec::new(),
                    });
                match method {
                    SearchMethod::Semantic => group.semantic = score,
                    SearchMethod::Bm25 => group.bm25 = score,
                    SearchMethod::Tfidf => group.tfidf = score,
                }
                if !group.methods.contains(&method) {
                    group.methods.push(method);
                }
            }
        };
        merge(semantic, SearchMethod::Semantic);
        merge(bm25, SearchMethod::Bm25);
        merge(tfidf, SearchMethod::Tfidf);

        let query_merchant = extract_merchant_id(query);
        let query_gateway = extract_payment_gateway(query);
        let query_terms = exact_technical_terms(query);
        let query_tag_terms: Vec<String> = query_entities(query)
            .into_iter()
            .chain(query_terms.iter().cloned())
            .collect();

        // The min-max bottom of a single method normalizes to exactly zero;
        // such a candidate carries no ranking signal at all.
        let mut results: Vec<RetrievedIncident> = groups
            .into_values()
            .filter(|group| group.semantic > 0.0 || group.bm25 > 0.0 || group.tfidf > 0.0)
            .map(|group| {
                let incident_text = group.incident.combined_text();
                let mut score = self.config.semantic_weight * group.semantic
                    + self.config.bm25_weight * group.bm25
                    + self.config.tfidf_weight * group.tfidf;

                // Exact technical-term ladder
                let exact_term_boost = Self::exact_term_boost(&query_terms, &incident_text);
                score *= exact_term_boost;

                // Merchant / gateway priority
                let match_type = Self::priority_match(
                    query_merchant.as_deref(),
                    query_gateway.as_deref(),
                    &incident_text,
                );
                score = match match_type {
                    MatchType::PerfectMerchantGateway => {
                        (score * boosts::PERFECT_MATCH.0).min(boosts::PERFECT_MATCH.1)
                    }
                    MatchType::MerchantId => {
                        (score * boosts::MERCHANT_MATCH.0).min(boosts::MERCHANT_MATCH.1)
                    }
                    MatchType::PaymentGateway => {
                        (score * boosts::GATEWAY_MATCH.0).min(boosts::GATEWAY_MATCH.1)
                    }
                    _ => score,
                };

                // Exact or near-exact title match
                let is_exact_match = Self::is_exact_match(query, &group.incident, match_type);
                if is_exact_match {
                    score *= boosts::EXACT_TITLE;
                    tracing::debug!(
                        id = %group.incident.id,
                        match_type = ?match_type,
                        "Exact match detected"
                    );
                }

                // Multi-method agreement
                let method_count = group.methods.len();
                if method_count > 1 {
                    score *= 1.0 + fusion::METHOD_AGREEMENT_BONUS * (method_count as f32 - 1.0);
                }

                let tag_match_score =
                    Self::tag_match_score(&query_tag_terms, &group.incident.tags);

                RetrievedIncident {
                    incident: group.incident,
                    fused_score: score.clamp(0.0, 1.0),
                    semantic_score: group.semantic,
                    bm25_score: group.bm25,
                    tfidf_score: group.tfidf,
                    search_methods: group.methods,
                    method_count,
                    match_type,
                    is_exact_match,
                    exact_term_boost,
                    tag_match_score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.method_count.cmp(&a.method_count))
                .then(a.incident.id.cmp(&b.incident.id))
        });
        results
    }

    /// Boost ladder over the ratio of the query's exact technical terms
    /// found in the incident. 1.0 when the query has no exact terms.
    fn exact_term_boost(query_terms: &std::collections::HashSet<String>, incident_text: &str) -> f32 {
        if query_terms.is_empty() {
            return 1.0;
        }
        let incident_terms = exact_technical_terms(incident_text);
        let matched = query_terms.intersection(&incident_terms).count();
        let ratio = matched as f32 / query_terms.len() as f32;

        for (floor, multiplier) in boosts::EXACT_TERM_LADDER {
            if ratio >= floor {
                return multiplier;
            }
        }
        1.0
    }

    fn priority_match(
        query_merchant: Option<&str>,
        query_gateway: Option<&str>,
        incident_text: &str,
    ) -> MatchType {
        let incident_merchant = extract_merchant_id(incident_text);
        let incident_gateway = extract_payment_gateway(incident_text);

        let merchant_match = matches!(
            (query_merchant, incident_merchant.as_deref()),
            (Some(q), Some(i)) if q.eq_ignore_ascii_case(i)
        );
        let gateway_match = matches!(
            (query_gateway, incident_gateway.as_deref()),
            (Some(q), Some(i)) if q.eq_ignore_ascii_case(i)
        );

        match (merchant_match, gateway_match) {
            (true, true) => MatchType::PerfectMerchantGateway,
            (true, false) => MatchType::MerchantId,
            (false, true) => MatchType::PaymentGateway,
            (false, false) => MatchType::Semantic,
        }
    }

    /// Exact title, >= 80% query-word overlap with the title, a tag equal
    /// to the query, or a perfect merchant+gateway match.
    fn is_exact_match(query: &str, incident: &Incident, match_type: MatchType) -> bool {
        if match_type == MatchType::PerfectMerchantGateway {
            return true;
        }

        let query_lower = query.trim().to_lowercase();
        let title_lower = incident.title.trim().to_lowercase();
        if !query_lower.is_empty() && query_lower == title_lower {
            return true;
        }

        let query_words: std::collections::HashSet<&str> =
            query_lower.split_whitespace().collect();
        if !query_words.is_empty() {
            let title_words: std::collections::HashSet<&str> =
                title_lower.split_whitespace().collect();
            let overlap = query_words.intersection(&title_words).count() as f32
                / query_words.len() as f32;
            if overlap >= boosts::TITLE_OVERLAP_RATIO {
                return true;
            }
        }

        incident
            .tags
            .iter()
            .any(|tag| tag.to_lowercase() == query_lower)
    }

    /// Ratio of query entities/terms matched against the incident tags
    fn tag_match_score(query_terms: &[String], tags: &[String]) -> f32 {
        if query_terms.is_empty() || tags.is_empty() {
            return 0.0;
        }
        let tags_lower: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        let matched = query_terms
            .iter()
            .filter(|term| {
                tags_lower
                    .iter()
                    .any(|tag| tag.contains(term.as_str()) || term.contains(tag.as_str()))
            })
            .count();
        matched as f32 / query_terms.len() as f32
    }
}
