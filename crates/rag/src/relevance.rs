//! Semantic relevance gate
//!
//! Decides whether retrieval output is trustworthy enough to surface. A
//! composite of domain compatibility, entity overlap, and intent alignment
//! is computed per candidate; a very high fused hybrid score overrides the
//! composite so exact keyword matches survive, while the composite stops
//! dense similarity from surfacing superficially adjacent incidents from a
//! different payment sub-domain.

use sherlock_config::constants::relevance;
use sherlock_core::RetrievedIncident;
use sherlock_text_processing::{domain_compatibility, query_entities, PaymentDomain, QueryIntent};

/// Why a match set was trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustReason {
    HighHybridConfidence,
    HighSemanticRelevance,
    ModerateSemanticRelevance,
    HybridSearchConfidence,
}

impl TrustReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustReason::HighHybridConfidence => "high_hybrid_confidence",
            TrustReason::HighSemanticRelevance => "high_semantic_relevance",
            TrustReason::ModerateSemanticRelevance => "moderate_semantic_relevance",
            TrustReason::HybridSearchConfidence => "hybrid_search_confidence",
        }
    }
}

/// Why a match set was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoIncidentsRetrieved,
    InsufficientSemanticOverlap,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoIncidentsRetrieved => "no_incidents_retrieved",
            RejectReason::InsufficientSemanticOverlap => "insufficient_semantic_overlap",
        }
    }
}

/// Gate verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Trust(TrustReason),
    Reject(RejectReason),
}

impl GateDecision {
    pub fn is_trust(&self) -> bool {
        matches!(self, GateDecision::Trust(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            GateDecision::Trust(reason) => reason.as_str(),
            GateDecision::Reject(reason) => reason.as_str(),
        }
    }
}

/// Stateless relevance validator
#[derive(Debug, Default, Clone, Copy)]
pub struct RelevanceGate;

impl RelevanceGate {
    pub fn new() -> Self {
        Self
    }

    /// Composite relevance of one candidate against the query:
    /// domain x 0.5 + entity overlap x 0.3 + intent alignment x 0.2.
    fn composite(
        query_domain: PaymentDomain,
        query_entities_set: &std::collections::HashSet<String>,
        query_intent: QueryIntent,
        candidate: &RetrievedIncident,
    ) -> f32 {
        let incident_text = candidate.incident.combined_text();

        let incident_domain = PaymentDomain::classify(&incident_text);
        let domain_match = domain_compatibility(query_domain, incident_domain);

        let incident_entities = query_entities(&incident_text);
        let entity_overlap = query_entities_set
            .intersection(&incident_entities)
            .count() as f32
            / query_entities_set.len().max(1) as f32;

        let incident_intent = QueryIntent::classify(&incident_text);
        let intent_alignment = if query_intent == incident_intent {
            1.0
        } else {
            relevance::INTENT_MISMATCH
        };

        let composite = domain_match * relevance::DOMAIN_WEIGHT
            + entity_overlap * relevance::ENTITY_WEIGHT
            + intent_alignment * relevance::INTENT_WEIGHT;

        tracing::debug!(
            incident_id = %candidate.incident.id,
            incident_domain = incident_domain.as_str(),
            domain_match,
            entity_overlap,
            intent_alignment,
            composite,
            "Candidate relevance"
        );
        composite
    }

    /// Validate the ranked candidates against the query
    pub fn validate(&self, query: &str, candidates: &[RetrievedIncident]) -> GateDecision {
        if candidates.is_empty() {
            return GateDecision::Reject(RejectReason::NoIncidentsRetrieved);
        }

        let query_lower = query.to_lowercase();
        let query_domain = PaymentDomain::classify(&query_lower);
        let query_entities_set = query_entities(&query_lower);
        let query_intent = QueryIntent::classify(&query_lower);

        let best_composite = candidates
            .iter()
            .map(|c| Self::composite(query_domain, &query_entities_set, query_intent, c))
            .fold(0.0f32, f32::max);

        let max_hybrid = candidates
            .iter()
            .map(|c| c.fused_score)
            .fold(0.0f32, f32::max);

        let decision = if max_hybrid >= relevance::HYBRID_OVERRIDE {
            GateDecision::Trust(TrustReason::HighHybridConfidence)
        } else if best_composite >= relevance::HIGH_COMPOSITE {
            GateDecision::Trust(TrustReason::HighSemanticRelevance)
        } else if best_composite >= relevance::MODERATE_COMPOSITE {
            GateDecision::Trust(TrustReason::ModerateSemanticRelevance)
        } else if max_hybrid >= relevance::HYBRID_FLOOR
            && best_composite >= relevance::HYBRID_COMPOSITE_FLOOR
        {
            GateDecision::Trust(TrustReason::HybridSearchConfidence)
        } else {
            GateDecision::Reject(RejectReason::InsufficientSemanticOverlap)
        };

        tracing::info!(
            query,
            best_composite,
            max_hybrid,
            decision = decision.reason(),
            "Relevance gate decision"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sherlock_core::Incident;

    fn candidate(title: &str, description: &str, tags: &[&str], fused: f32) -> RetrievedIncident {
        let mut retrieved = RetrievedIncident::exact(Incident {
            id: "JSP-1".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            resolution: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        });
        retrieved.fused_score = fused;
        retrieved
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let gate = RelevanceGate::new();
        assert_eq!(
            gate.validate("upi timeout", &[]),
            GateDecision::Reject(RejectReason::NoIncidentsRetrieved)
        );
    }

    #[test]
    fn test_hybrid_override_trusts_regardless_of_composite() {
        let gate = RelevanceGate::new();
        let candidates = vec![candidate(
            "Completely unrelated title",
            "nothing shared at all",
            &[],
            0.85,
        )];
        assert_eq!(
            gate.validate("upi payment failed with error 5003", &candidates),
            GateDecision::Trust(TrustReason::HighHybridConfidence)
        );
    }

    #[test]
    fn test_same_domain_and_entities_trusted() {
        let gate = RelevanceGate::new();
        let candidates = vec![candidate(
            "UPI payment failed with error 5003",
            "upi collect requests failing at the psp",
            &["upi"],
            0.5,
        )];
        let decision = gate.validate("upi payment failing", &candidates);
        assert!(decision.is_trust());
    }

    #[test]
    fn test_cross_domain_low_score_rejected() {
        let gate = RelevanceGate::new();
        // Wallet query vs card incident, weak hybrid score, no shared entities
        let candidates = vec![candidate(
            "Card tokenization declined by issuer",
            "visa tokenization flow rejecting tokens",
            &["card"],
            0.2,
        )];
        let decision = gate.validate("mobikwik wallet balance not updating", &candidates);
        assert_eq!(
            decision,
            GateDecision::Reject(RejectReason::InsufficientSemanticOverlap)
        );
    }

    #[test]
    fn test_moderate_hybrid_with_small_composite_trusted() {
        let gate = RelevanceGate::new();
        // Gateway-domain incident vs upi query: related domain (0.5 * 0.5 =
        // 0.25) + mismatched intent (0.3 * 0.2 = 0.06) -> composite ~0.31,
        // which already passes the moderate band
        let candidates = vec![candidate(
            "Gateway integration checklist",
            "api integration steps for onboarding",
            &["gateway"],
            0.55,
        )];
        let decision = gate.validate("upi payment failed", &candidates);
        assert!(decision.is_trust());
    }
}
