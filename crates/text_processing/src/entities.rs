//! Payment entity and technical-term extraction
//!
//! Three disjoint case-insensitive vocabularies: merchants, payment
//! gateways, and exact technical terms (error codes, crypto standards,
//! gateway-qualified names). Extraction is substring/regex based over the
//! lowercased raw text; the keyword indices never see these.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Known merchant identifiers
pub const MERCHANTS: &[&str] = &[
    "snapdeal", "firstcry", "mobikwik", "citymall", "flipkart", "amazon",
];

/// Known payment gateways; suffixes like `_online` / `_gateway` / `_pg`
/// are stripped during extraction
pub const GATEWAYS: &[&str] = &[
    "pinelabs", "payu", "razorpay", "checkout", "stripe", "cashfree", "amazonpay", "phonepe",
    "gpay", "paytm",
];

/// Known banks, used for entity overlap only
pub const BANKS: &[&str] = &["hdfc", "axis", "icici", "sbi", "kotak"];

/// Error codes that must match exactly between query and incident
const ERROR_CODES: &[&str] = &[
    "messagenotrecognized",
    "internal_server_error",
    "transienterror",
    "invalidrequest",
    "authenticationfailed",
    "insufficientfunds",
    "cardexpired",
    "invalidcvv",
    "invalidpin",
    "cardblocked",
    "limitexceeded",
];

/// Cryptographic and protocol standards
const TECH_STANDARDS: &[&str] = &[
    "pkcs15", "pkcs1", "rsa", "aes", "sha256", "hmac", "jwt", "oauth", "ssl", "tls", "x509",
];

/// Gateway-qualified terms
const GATEWAY_TERMS: &[&str] = &[
    "pinelabs-online",
    "checkout",
    "razorpay",
    "payu",
    "amazonpay",
    "phonepe",
    "gpay",
    "paytm",
];

/// General technical vocabulary contributing to entity overlap
const ENTITY_TERMS: &[&str] = &[
    "messagenotrecognized",
    "pkcs15",
    "rsa",
    "ssl",
    "tls",
    "internal_server_error",
    "timeout",
    "webhook",
    "callback",
    "tokenization",
    "encryption",
    "decryption",
    "signature",
    "authentication",
    "authorization",
    "validation",
];

static MERCHANT_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"merchant_id[:\s]+([a-z0-9_-]+)").unwrap(),
        Regex::new(r"mid[:\s]+([a-z0-9_-]+)").unwrap(),
        Regex::new(r"\b([a-z0-9_]+_test)\b").unwrap(),
        Regex::new(r"\b([a-z0-9_]+_prod)\b").unwrap(),
    ]
});

static GATEWAY_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"pg[:\s]+([a-z0-9_-]+)").unwrap(),
        Regex::new(r"payment[_\s]*gateway[:\s]+([a-z0-9_-]+)").unwrap(),
    ]
});

/// Extract a merchant identifier from text, if any.
///
/// Specific id patterns (`merchant_id: x`, `mid: x`, `x_test`, `x_prod`)
/// win over the bare closed-list names so that `mid: snapdeal_test`
/// yields `snapdeal_test`, not `snapdeal`.
pub fn extract_merchant_id(text: &str) -> Option<String> {
    let text = text.to_lowercase();

    for pattern in MERCHANT_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(&text) {
            return Some(captures[1].to_string());
        }
    }

    MERCHANTS
        .iter()
        .find(|merchant| text.contains(*merchant))
        .map(|merchant| merchant.to_string())
}

/// Extract a payment gateway from text, if any.
///
/// The closed list wins over the generic `pg:` / `payment gateway:`
/// patterns; `_gateway`, `_pg`, and `_online` suffixes are stripped.
pub fn extract_payment_gateway(text: &str) -> Option<String> {
    let text = text.to_lowercase();

    if let Some(gateway) = GATEWAYS.iter().find(|gateway| text.contains(*gateway)) {
        return Some(gateway.to_string());
    }

    for pattern in GATEWAY_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(&text) {
            let gateway = captures[1]
                .trim_end_matches("_gateway")
                .trim_end_matches("_pg")
                .trim_end_matches("_online")
                .to_string();
            return Some(gateway);
        }
    }

    None
}

/// Entities (merchants, gateways, banks, technical vocabulary) present in text
pub fn query_entities(text: &str) -> HashSet<String> {
    let text = text.to_lowercase();
    let mut entities = HashSet::new();

    for term in MERCHANTS
        .iter()
        .chain(GATEWAYS.iter())
        .chain(BANKS.iter())
        .chain(ENTITY_TERMS.iter())
    {
        if text.contains(term) {
            entities.insert(term.to_string());
        }
    }

    entities
}

/// Exact technical terms that must match precisely between query and incident
pub fn exact_technical_terms(text: &str) -> HashSet<String> {
    let text = text.to_lowercase();
    let mut terms = HashSet::new();

    for term in ERROR_CODES
        .iter()
        .chain(TECH_STANDARDS.iter())
        .chain(GATEWAY_TERMS.iter())
    {
        if text.contains(term) {
            terms.insert(term.to_string());
        }
    }

    terms
}
