//! Exact-id detection and payment-domain gating
//!
//! An id anywhere in the query always wins and bypasses every other gate;
//! only id-free queries are tested against the payment vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;

/// Routing verdict for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The query names an incident id (canonical upper-case form)
    IncidentId(String),
    /// Payment-domain query, continue down the pipeline
    InDomain,
    /// Nothing payment-related in the query
    OutOfDomain,
}

static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b((?:JSP|EUL|JIRA|INC|TICKET|BUG|ISSUE)-\d+)\b").unwrap(),
        Regex::new(r"(?i)\b(SLACK-\d+-\d+)\b").unwrap(),
    ]
});

/// Payment-domain vocabulary, plus bank/PSP names
const PAYMENT_KEYWORDS: &[&str] = &[
    "payment",
    "upi",
    "gateway",
    "transaction",
    "card",
    "wallet",
    "bank",
    "refund",
    "settlement",
    "webhook",
    "api",
    "integration",
    "timeout",
    "error",
    "failure",
    "processing",
    "authorization",
    "authentication",
    "merchant",
    "pinelabs",
    "payu",
    "razorpay",
    "hdfc",
    "axis",
    "icici",
    "sbi",
    "kotak",
    "visa",
    "mastercard",
    "mobikwik",
    "paytm",
    "phonepe",
    "gpay",
    "amazonpay",
    "irctc",
];

/// Stateless router over the id patterns and the domain vocabulary
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryRouter;

impl QueryRouter {
    pub fn new() -> Self {
        Self
    }

    /// Extract an incident id from anywhere in the query, canonical
    /// upper-case. Case-insensitive.
    pub fn extract_incident_id(&self, query: &str) -> Option<String> {
        let query = query.trim();
        for pattern in ID_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(query) {
                let id = captures[1].to_uppercase();
                tracing::info!(query, extracted_id = %id, "Exact incident id extracted");
                return Some(id);
            }
        }
        None
    }

    /// True when any payment vocabulary term occurs in the query
    pub fn is_payment_domain(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        PAYMENT_KEYWORDS.iter().any(|keyword| query.contains(keyword))
    }

    /// Id check first; the domain gate never sees id-bearing queries
    pub fn route(&self, query: &str) -> RouteDecision {
        if let Some(id) = self.extract_incident_id(query) {
            return RouteDecision::IncidentId(id);
        }
        if self.is_payment_domain(query) {
            RouteDecision::InDomain
        } else {
            tracing::info!(query, "Query rejected by payment-domain gate");
            RouteDecision::OutOfDomain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_known_id_formats() {
        let router = QueryRouter::new();
        for (input, expected) in [
            ("JSP-1046", "JSP-1046"),
            ("eul-12", "EUL-12"),
            ("JIRA-5678", "JIRA-5678"),
            ("inc-9999", "INC-9999"),
            ("TICKET-1", "TICKET-1"),
            ("bug-77", "BUG-77"),
            ("issue-3", "ISSUE-3"),
            ("SLACK-1699999999-42", "SLACK-1699999999-42"),
        ] {
            assert_eq!(
                router.extract_incident_id(input).as_deref(),
                Some(expected),
                "failed for {input}"
            );
        }
    }

    #[test]
    fn test_id_embedded_in_prose() {
        let router = QueryRouter::new();
        assert_eq!(
            router
                .extract_incident_id("can you help me to solve this jsp-1030 please")
                .as_deref(),
            Some("JSP-1030")
        );
    }

    #[test]
    fn test_whitespace_and_case_insensitive() {
        let router = QueryRouter::new();
        assert_eq!(
            router.extract_incident_id("  jsp-1046  ").as_deref(),
            Some("JSP-1046")
        );
    }

    #[test]
    fn test_rejects_malformed_ids() {
        let router = QueryRouter::new();
        assert_eq!(router.extract_incident_id("JSPX-1046"), None);
        assert_eq!(router.extract_incident_id("JSP-"), None);
        assert_eq!(router.extract_incident_id("SLACK-123"), None);
        assert_eq!(router.extract_incident_id("FOO-123"), None);
    }

    #[test]
    fn test_domain_gate() {
        let router = QueryRouter::new();
        assert_eq!(
            router.route("why do refunds fail frequently"),
            RouteDecision::InDomain
        );
        assert_eq!(
            router.route("how to deploy a microservice"),
            RouteDecision::OutOfDomain
        );
    }

    #[test]
    fn test_id_bypasses_domain_gate() {
        let router = QueryRouter::new();
        assert_eq!(
            router.route("deploy notes for JSP-1046"),
            RouteDecision::IncidentId("JSP-1046".to_string())
        );
    }
}
