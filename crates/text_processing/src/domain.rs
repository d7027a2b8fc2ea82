//! Payment-domain and intent classification
//!
//! Keyword-presence classification over lowercased raw text. The domain
//! compatibility table keeps dense-similarity matches from crossing
//! sub-domains (a wallet incident is a poor answer to a card question
//! however close the vectors are).

use serde::{Deserialize, Serialize};

/// Payment sub-domain of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDomain {
    Wallet,
    Card,
    Upi,
    Webhook,
    Gateway,
    General,
}

impl PaymentDomain {
    /// Classify a text by keyword presence, first hit wins
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let contains_any = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

        if contains_any(&["wallet", "mobikwik", "paytm", "phonepe_wallet", "amazonpay"]) {
            PaymentDomain::Wallet
        } else if contains_any(&["card", "visa", "mastercard", "debit", "credit", "tokenization"]) {
            PaymentDomain::Card
        } else if contains_any(&["upi", "bhim", "gpay", "phonepe_upi"]) {
            PaymentDomain::Upi
        } else if contains_any(&["webhook", "callback", "notification"]) {
            PaymentDomain::Webhook
        } else if contains_any(&["gateway", "api", "integration"]) {
            PaymentDomain::Gateway
        } else {
            PaymentDomain::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDomain::Wallet => "wallet",
            PaymentDomain::Card => "card",
            PaymentDomain::Upi => "upi",
            PaymentDomain::Webhook => "webhook",
            PaymentDomain::Gateway => "gateway",
            PaymentDomain::General => "general",
        }
    }

    /// Domains considered adjacent to this one
    fn related(&self) -> &'static [PaymentDomain] {
        match self {
            PaymentDomain::Wallet | PaymentDomain::Card | PaymentDomain::Upi
            | PaymentDomain::Webhook => &[PaymentDomain::Gateway, PaymentDomain::General],
            PaymentDomain::Gateway => &[
                PaymentDomain::Wallet,
                PaymentDomain::Card,
                PaymentDomain::Upi,
                PaymentDomain::Webhook,
                PaymentDomain::General,
            ],
            PaymentDomain::General => &[],
        }
    }
}

/// Compatibility between a query domain and an incident domain:
/// 1.0 equal, 0.5 related, 0.1 otherwise.
pub fn domain_compatibility(query: PaymentDomain, incident: PaymentDomain) -> f32 {
    if query == incident {
        1.0
    } else if query.related().contains(&incident) {
        0.5
    } else {
        0.1
    }
}

/// Primary intent of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Troubleshooting,
    Integration,
    Testing,
    General,
}

impl QueryIntent {
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let contains_any = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

        if contains_any(&["failed", "failing", "error", "timeout", "blocked"]) {
            QueryIntent::Troubleshooting
        } else if contains_any(&["integrate", "integration", "setup", "configure"]) {
            QueryIntent::Integration
        } else if contains_any(&["test", "testing", "sandbox", "debug"]) {
            QueryIntent::Testing
        } else {
            QueryIntent::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Troubleshooting => "troubleshooting",
            QueryIntent::Integration => "integration",
            QueryIntent::Testing => "testing",
            QueryIntent::General => "general",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_classification() {
        assert_eq!(
            PaymentDomain::classify("mobikwik wallet balance stuck"),
            PaymentDomain::Wallet
        );
        assert_eq!(
            PaymentDomain::classify("card tokenization failing"),
            PaymentDomain::Card
        );
        assert_eq!(
            PaymentDomain::classify("UPI payment failed with error 5003"),
            PaymentDomain::Upi
        );
        assert_eq!(
            PaymentDomain::classify("webhook signature mismatch on callback"),
            PaymentDomain::Webhook
        );
        assert_eq!(
            PaymentDomain::classify("gateway integration broken"),
            PaymentDomain::Gateway
        );
        assert_eq!(
            PaymentDomain::classify("refund stuck"),
            PaymentDomain::General
        );
    }

    #[test]
    fn test_domain_compatibility() {
        assert_eq!(
            domain_compatibility(PaymentDomain::Wallet, PaymentDomain::Wallet),
            1.0
        );
        assert_eq!(
            domain_compatibility(PaymentDomain::Wallet, PaymentDomain::Gateway),
            0.5
        );
        assert_eq!(
            domain_compatibility(PaymentDomain::Wallet, PaymentDomain::Card),
            0.1
        );
        assert_eq!(
            domain_compatibility(PaymentDomain::Gateway, PaymentDomain::Upi),
            0.5
        );
    }

    #[test]
    fn test_intent_classification() {
        assert_eq!(
            QueryIntent::classify("payment failed with timeout"),
            QueryIntent::Troubleshooting
        );
        assert_eq!(
            QueryIntent::classify("how to integrate the refund api"),
            QueryIntent::Integration
        );
        assert_eq!(
            QueryIntent::classify("sandbox credentials for upi"),
            QueryIntent::Testing
        );
        assert_eq!(QueryIntent::classify("refund status"), QueryIntent::General);
    }
}
