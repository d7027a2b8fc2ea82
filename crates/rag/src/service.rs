//! RAG orchestrator
//!
//! Per-request state machine:
//!
//! ```text
//! ENTRY -> ID_CHECK -> (exact-id fetch -> summarize | not-found)
//!       -> DOMAIN_CHECK -> CLASSIFY -> RETRIEVE -> VALIDATE
//!       -> SCORE -> GENERATE -> EMIT
//! ```
//!
//! Nothing escapes this boundary: every failure mode becomes a
//! `RagResponse` with a `rag_strategy` label, down to `error_fallback`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use sherlock_config::constants::{confidence as confidence_consts, retrieval as retrieval_consts};
use sherlock_core::{
    ChatModel, Embedder, EmbeddingRecord, Incident, QueryComplexity, RagResponse, RagStrategy,
    Result, RetrievedIncident, VectorIndex,
};
use sherlock_retrieval::{CorpusStats, CorpusStore, HybridRetriever};

use crate::classifier::QueryClassifier;
use crate::confidence::score_confidence;
use crate::context::build_sources;
use crate::feedback::{FeedbackEntry, FeedbackLog, FeedbackVerdict};
use crate::generator::AnswerGenerator;
use crate::relevance::RelevanceGate;
use crate::router::{QueryRouter, RouteDecision};
use crate::RagError;

/// Aggregate service metrics
#[derive(Debug, Clone, Serialize)]
pub struct RagMetrics {
    pub classifier_cache_size: usize,
    pub complexity_distribution: ComplexityDistribution,
    pub confidence_threshold: f32,
    pub feedback_count: usize,
    pub helpful_ratio: Option<f32>,
    pub index: CorpusStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexityDistribution {
    pub simple: usize,
    pub complex: usize,
    pub unknown: usize,
}

/// Live health probe result
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub tested_classification: String,
    pub tested_retrieval_count: usize,
    pub corpus_size: usize,
    pub timing_ms: f64,
}

/// Top-level RAG service
pub struct RagService {
    router: QueryRouter,
    classifier: QueryClassifier,
    generator: AnswerGenerator,
    gate: RelevanceGate,
    retriever: Arc<HybridRetriever>,
    corpus: Arc<CorpusStore>,
    embedder: Option<Arc<dyn Embedder>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    feedback: FeedbackLog,
}

impl RagService {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        corpus: Arc<CorpusStore>,
        retriever: Arc<HybridRetriever>,
    ) -> Self {
        Self {
            router: QueryRouter::new(),
            classifier: QueryClassifier::new(chat.clone()),
            generator: AnswerGenerator::new(chat),
            gate: RelevanceGate::new(),
            retriever,
            corpus,
            embedder: None,
            vector_index: None,
            feedback: FeedbackLog::new(),
        }
    }

    /// Attach the dense backend used by `build_indices` for embedding upserts
    pub fn with_dense_backend(
        mut self,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.vector_index = Some(vector_index);
        self
    }

    /// top_k / min_score by complexity
    fn retrieval_params(complexity: QueryComplexity) -> (usize, f32) {
        match complexity {
            QueryComplexity::Simple => (
                retrieval_consts::SIMPLE_TOP_K,
                retrieval_consts::SIMPLE_MIN_SCORE,
            ),
            QueryComplexity::Complex => (
                retrieval_consts::COMPLEX_TOP_K,
                retrieval_consts::COMPLEX_MIN_SCORE,
            ),
            QueryComplexity::Unknown => (
                retrieval_consts::UNKNOWN_TOP_K,
                retrieval_consts::UNKNOWN_MIN_SCORE,
            ),
        }
    }

    /// Process one query end to end; never errors past this boundary
    pub async fn process_query(&self, query: &str) -> RagResponse {
        let start = Instant::now();
        match self.process_inner(query, start).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(query, error = %e, "Pipeline failed, emitting error fallback");
                RagResponse::empty(
                    query,
                    format!("RAG pipeline error: {e}"),
                    0.0,
                    QueryComplexity::Unknown,
                    RagStrategy::ErrorFallback,
                    elapsed_ms(start),
                )
            }
        }
    }

    async fn process_inner(&self, query: &str, start: Instant) -> Result<RagResponse> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery.into());
        }

        // Exact-id detection always wins and bypasses retrieval entirely
        match self.router.route(query) {
            RouteDecision::IncidentId(id) => Ok(self.process_exact_id(query, &id, start).await),
            RouteDecision::OutOfDomain => Ok(RagResponse::empty(
                query,
                AnswerGenerator::domain_rejection_answer(query),
                1.0,
                QueryComplexity::Unknown,
                RagStrategy::DomainFilter,
                elapsed_ms(start),
            )),
            RouteDecision::InDomain => self.process_retrieval(query, start).await,
        }
    }

    async fn process_exact_id(&self, query: &str, id: &str, start: Instant) -> RagResponse {
        tracing::info!(query, incident_id = id, "Exact-id branch, bypassing retrieval");

        let Some(incident) = self.corpus.by_id(id) else {
            tracing::info!(incident_id = id, "Exact incident not found");
            return RagResponse::empty(
                query,
                AnswerGenerator::not_found_answer(id),
                1.0,
                QueryComplexity::Simple,
                RagStrategy::ExactIdNotFound,
                elapsed_ms(start),
            );
        };

        let summary = self.generator.exact_summary(&incident).await;
        let answer = AnswerGenerator::format_exact_response(&incident, &summary);
        let retrieved = vec![RetrievedIncident::exact(incident)];
        let sources = build_sources(&retrieved);

        RagResponse {
            query: query.to_string(),
            generated_answer: answer,
            retrieved_incidents: retrieved,
            sources,
            confidence_score: 1.0,
            query_complexity: QueryComplexity::Simple,
            execution_time_ms: elapsed_ms(start),
            rag_strategy: RagStrategy::ExactIdLookup,
            timestamp: Utc::now(),
        }
    }

    async fn process_retrieval(&self, query: &str, start: Instant) -> Result<RagResponse> {
        let complexity = self.classifier.classify(query).await;
        let (top_k, min_score) = Self::retrieval_params(complexity);

        let incidents = self.retriever.hybrid_search(query, top_k, min_score).await;

        let gate_decision = self.gate.validate(query, &incidents);
        if !gate_decision.is_trust() {
            tracing::info!(
                query,
                reason = gate_decision.reason(),
                incidents_count = incidents.len(),
                "No trustworthy incidents, emitting honest rejection"
            );
            return Ok(RagResponse::empty(
                query,
                AnswerGenerator::no_results_answer(query),
                0.0,
                complexity,
                RagStrategy::NoRelevantResults,
                elapsed_ms(start),
            ));
        }

        let confidence = score_confidence(&incidents, complexity);
        if confidence < confidence_consts::FLOOR {
            tracing::info!(
                query,
                confidence,
                top_incident = incidents.first().map(|i| i.incident.id.as_str()),
                "Low-confidence match rejected"
            );
            return Ok(RagResponse::empty(
                query,
                AnswerGenerator::no_results_answer(query),
                confidence,
                complexity,
                RagStrategy::LowConfidenceRejected,
                elapsed_ms(start),
            ));
        }

        let answer = self
            .generator
            .generate_answer(query, &incidents, complexity)
            .await;
        let sources = build_sources(&incidents);
        let strategy = RagStrategy::retrieved(complexity, incidents.len());

        tracing::info!(
            query,
            complexity = %complexity,
            incidents_count = incidents.len(),
            confidence,
            strategy = %strategy,
            "Pipeline completed"
        );

        Ok(RagResponse {
            query: query.to_string(),
            generated_answer: answer,
            retrieved_incidents: incidents,
            sources,
            confidence_score: confidence,
            query_complexity: complexity,
            execution_time_ms: elapsed_ms(start),
            rag_strategy: strategy,
            timestamp: Utc::now(),
        })
    }

    /// Record an operator verdict on a previously returned response
    pub fn log_feedback(
        &self,
        query: &str,
        response: &RagResponse,
        verdict: FeedbackVerdict,
        comment: Option<String>,
        helpful: bool,
    ) -> bool {
        self.feedback.record(FeedbackEntry {
            timestamp: Utc::now(),
            query: query.to_string(),
            rag_strategy: response.rag_strategy.label(),
            query_complexity: response.query_complexity.as_str().to_string(),
            retrieved_incident_ids: response
                .retrieved_incidents
                .iter()
                .map(|r| r.incident.id.clone())
                .collect(),
            confidence_score: response.confidence_score,
            execution_time_ms: response.execution_time_ms,
            verdict,
            comment,
            helpful,
        });
        true
    }

    pub fn metrics(&self) -> RagMetrics {
        let (simple, complex, unknown) = self.classifier.complexity_distribution();
        RagMetrics {
            classifier_cache_size: self.classifier.cache_len(),
            complexity_distribution: ComplexityDistribution {
                simple,
                complex,
                unknown,
            },
            confidence_threshold: confidence_consts::FLOOR,
            feedback_count: self.feedback.len(),
            helpful_ratio: self.feedback.helpful_ratio(),
            index: self.corpus.stats(),
        }
    }

    /// Exercise classification and retrieval against the live pipeline
    pub async fn health_check(&self) -> HealthReport {
        let start = Instant::now();

        let complexity = self.classifier.classify("payment gateway timeout").await;
        let retrieved = self
            .retriever
            .hybrid_search("upi payment failure", retrieval_consts::SIMPLE_TOP_K, 0.0)
            .await;

        let corpus_size = self.corpus.len();
        let status = if corpus_size > 0 {
            "healthy"
        } else {
            "degraded"
        };

        HealthReport {
            status: status.to_string(),
            tested_classification: complexity.as_str().to_string(),
            tested_retrieval_count: retrieved.len(),
            corpus_size,
            timing_ms: elapsed_ms(start),
        }
    }

    /// Suggestions passthrough for the thin surfaces
    pub fn suggestions(&self, query: &str, max_suggestions: usize) -> Vec<String> {
        self.corpus.suggestions(query, max_suggestions)
    }

    /// Rebuild the keyword indices and (when a dense backend is attached)
    /// re-upsert every incident embedding. Returns false on failure rather
    /// than erroring, matching the operator surface.
    pub async fn build_indices(&self, incidents: Vec<Incident>) -> bool {
        let count = incidents.len();
        tracing::info!(total_incidents = count, "Building indices");

        if let Err(e) = self.corpus.rebuild(incidents) {
            tracing::error!(error = %e, "Index rebuild failed");
            return false;
        }

        if let (Some(embedder), Some(vector_index)) = (&self.embedder, &self.vector_index) {
            let snapshot = self.corpus.all();
            let texts: Vec<String> = snapshot.iter().map(|i| i.searchable_text()).collect();

            let vectors = match embedder.embed_batch(&texts).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    tracing::error!(error = %e, "Batch embedding failed, vector index not updated");
                    return false;
                }
            };

            let mut records = Vec::with_capacity(vectors.len());
            let mut skipped = 0usize;
            for (incident, vector) in snapshot.iter().zip(vectors) {
                if vector.iter().all(|v| *v == 0.0) {
                    skipped += 1;
                    continue;
                }
                records.push(EmbeddingRecord {
                    id: incident.id.clone(),
                    vector,
                    metadata: incident_metadata(incident),
                });
            }
            if skipped > 0 {
                tracing::warn!(skipped, "Zero-vector embeddings skipped during upsert");
            }

            if let Err(e) = vector_index.upsert(&records).await {
                tracing::error!(error = %e, "Embedding upsert failed");
                return false;
            }
        }

        tracing::info!(corpus_size = self.corpus.len(), "Indices built");
        true
    }
}

/// Payload metadata stored alongside each embedding, enough to rebuild a
/// presentable incident in semantic-only degraded mode
fn incident_metadata(incident: &Incident) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("title".to_string(), incident.title.clone());
    metadata.insert("description".to_string(), incident.description.clone());
    metadata.insert("resolution".to_string(), incident.resolution.clone());
    metadata.insert("tags".to_string(), incident.tags.join(","));
    metadata.insert("created_at".to_string(), incident.created_at.clone());
    metadata.insert("resolved_by".to_string(), incident.resolved_by.clone());
    metadata
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
