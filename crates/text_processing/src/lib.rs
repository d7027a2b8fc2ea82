//! Text normalization and payment-entity extraction
//!
//! Features:
//! - Deterministic tokenization for the keyword indices (lowercase,
//!   punctuation stripping, stopword removal, Porter stemming)
//! - Merchant / gateway / technical-term extraction over closed
//!   vocabularies and regex patterns
//! - Payment-domain and query-intent classification

pub mod domain;
pub mod entities;
pub mod normalize;
pub mod stopwords;

pub use domain::{domain_compatibility, PaymentDomain, QueryIntent};
pub use entities::{
    exact_technical_terms, extract_merchant_id, extract_payment_gateway, query_entities,
};
pub use normalize::{normalize, tokenize, tokenize_unstemmed};
pub use stopwords::is_stopword;
