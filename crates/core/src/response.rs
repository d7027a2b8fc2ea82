//! Pipeline response types
//!
//! `RagResponse` is the only shape the engine emits. Every branch of the
//! orchestrator (exact-id hits, domain rejections, honest "no results",
//! error fallbacks) produces one, tagged with the `RagStrategy` that built it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incident::Incident;

/// Query complexity classification for adaptive retrieval routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryComplexity {
    /// Single-incident lookup (e.g. "UPI timeout error 5003")
    Simple,
    /// Multi-incident analysis (e.g. "Why do refunds fail?")
    Complex,
    /// No relevant incidents expected
    Unknown,
}

impl QueryComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Simple => "simple",
            QueryComplexity::Complex => "complex",
            QueryComplexity::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which retrieval method produced (part of) a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Semantic,
    Bm25,
    Tfidf,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Semantic => "semantic",
            SearchMethod::Bm25 => "bm25",
            SearchMethod::Tfidf => "tfidf",
        }
    }
}

/// How a result matched the query, from strongest to weakest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Direct id lookup, bypassing retrieval entirely
    #[serde(rename = "EXACT_ID")]
    ExactId,
    /// Same merchant and same payment gateway
    #[serde(rename = "PERFECT_MERCHANT_GATEWAY_MATCH")]
    PerfectMerchantGateway,
    /// Same merchant identifier
    #[serde(rename = "MERCHANT_ID_MATCH")]
    MerchantId,
    /// Same payment gateway
    #[serde(rename = "PAYMENT_GATEWAY_MATCH")]
    PaymentGateway,
    /// Regular semantic/keyword match
    #[serde(rename = "SEMANTIC_MATCH")]
    Semantic,
}

/// A retrieved incident with full scoring provenance.
///
/// The per-method scores, method set, and boost factors are consumed
/// downstream by the relevance gate and the confidence scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedIncident {
    #[serde(flatten)]
    pub incident: Incident,
    /// Final fused score in [0, 1]
    pub fused_score: f32,
    /// Normalized per-method scores
    pub semantic_score: f32,
    pub bm25_score: f32,
    pub tfidf_score: f32,
    /// Methods that contributed to this result
    pub search_methods: Vec<SearchMethod>,
    pub method_count: usize,
    pub match_type: MatchType,
    pub is_exact_match: bool,
    /// Exact technical-term boost that was applied (1.0 = none)
    pub exact_term_boost: f32,
    /// Ratio of query entities/terms found in the incident tags
    pub tag_match_score: f32,
}

impl RetrievedIncident {
    /// Build the exact-id variant: score 1.0, no retrieval provenance
    pub fn exact(incident: Incident) -> Self {
        Self {
            incident,
            fused_score: 1.0,
            semantic_score: 0.0,
            bm25_score: 0.0,
            tfidf_score: 0.0,
            search_methods: Vec::new(),
            method_count: 0,
            match_type: MatchType::ExactId,
            is_exact_match: true,
            exact_term_boost: 1.0,
            tag_match_score: 0.0,
        }
    }
}

/// Which branch of the pipeline produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RagStrategy {
    ExactIdLookup,
    ExactIdNotFound,
    DomainFilter,
    NoRelevantResults,
    LowConfidenceRejected,
    SimpleWith(usize),
    ComplexWith(usize),
    UnknownWith(usize),
    ErrorFallback,
}

impl RagStrategy {
    /// Variant for an accepted retrieval of `count` incidents
    pub fn retrieved(complexity: QueryComplexity, count: usize) -> Self {
        match complexity {
            QueryComplexity::Simple => RagStrategy::SimpleWith(count),
            QueryComplexity::Complex => RagStrategy::ComplexWith(count),
            QueryComplexity::Unknown => RagStrategy::UnknownWith(count),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RagStrategy::ExactIdLookup => "exact_id_lookup".to_string(),
            RagStrategy::ExactIdNotFound => "exact_id_not_found".to_string(),
            RagStrategy::DomainFilter => "domain_filter".to_string(),
            RagStrategy::NoRelevantResults => "no_relevant_results".to_string(),
            RagStrategy::LowConfidenceRejected => "low_confidence_rejected".to_string(),
            RagStrategy::SimpleWith(k) => format!("simple_query_with_{k}_incidents"),
            RagStrategy::ComplexWith(k) => format!("complex_query_with_{k}_incidents"),
            RagStrategy::UnknownWith(k) => format!("unknown_query_with_{k}_incidents"),
            RagStrategy::ErrorFallback => "error_fallback".to_string(),
        }
    }
}

impl Serialize for RagStrategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl std::fmt::Display for RagStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Structured response with sources and metadata
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub generated_answer: String,
    pub retrieved_incidents: Vec<RetrievedIncident>,
    /// Parallel citations, same length and ordering as `retrieved_incidents`
    pub sources: Vec<String>,
    pub confidence_score: f32,
    pub query_complexity: QueryComplexity,
    pub execution_time_ms: f64,
    pub rag_strategy: RagStrategy,
    pub timestamp: DateTime<Utc>,
}

impl RagResponse {
    /// A response carrying no incidents (rejections, misses, failures)
    pub fn empty(
        query: impl Into<String>,
        answer: impl Into<String>,
        confidence: f32,
        complexity: QueryComplexity,
        strategy: RagStrategy,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            query: query.into(),
            generated_answer: answer.into(),
            retrieved_incidents: Vec::new(),
            sources: Vec::new(),
            confidence_score: confidence,
            query_complexity: complexity,
            execution_time_ms,
            rag_strategy: strategy,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_labels() {
        assert_eq!(RagStrategy::ExactIdLookup.label(), "exact_id_lookup");
        assert_eq!(
            RagStrategy::retrieved(QueryComplexity::Complex, 8).label(),
            "complex_query_with_8_incidents"
        );
        assert_eq!(
            RagStrategy::retrieved(QueryComplexity::Unknown, 2).label(),
            "unknown_query_with_2_incidents"
        );
    }

    #[test]
    fn test_strategy_serializes_as_label() {
        let json = serde_json::to_string(&RagStrategy::SimpleWith(3)).unwrap();
        assert_eq!(json, "\"simple_query_with_3_incidents\"");
    }

    #[test]
    fn test_complexity_roundtrip() {
        let json = serde_json::to_string(&QueryComplexity::Complex).unwrap();
        assert_eq!(json, "\"complex\"");
        let back: QueryComplexity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QueryComplexity::Complex);
    }

    #[test]
    fn test_match_type_wire_names() {
        let json = serde_json::to_string(&MatchType::PerfectMerchantGateway).unwrap();
        assert_eq!(json, "\"PERFECT_MERCHANT_GATEWAY_MATCH\"");
    }

    #[test]
    fn test_retrieved_incident_flattens_record() {
        let retrieved = RetrievedIncident::exact(Incident {
            id: "JSP-1".to_string(),
            title: "t".to_string(),
            description: String::new(),
            resolution: String::new(),
            tags: vec![],
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        });
        let value = serde_json::to_value(&retrieved).unwrap();
        assert_eq!(value["id"], "JSP-1");
        assert_eq!(value["fused_score"], 1.0);
        assert_eq!(value["match_type"], "EXACT_ID");
    }
}
