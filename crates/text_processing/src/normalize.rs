//! Text normalization for the keyword indices
//!
//! Pure functions; the same input always yields the same token stream,
//! which the disk-cached indices depend on.

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};

use crate::stopwords::is_stopword;

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

/// Lowercase and replace every non-alphanumeric character with a space
fn clean(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect()
}

/// Tokenize for BM25: lowercase, strip punctuation, drop stopwords and
/// tokens of length <= 2, apply Porter stemming. Empty input yields an
/// empty list.
pub fn tokenize(text: &str) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .filter(|token| token.len() > 2 && !is_stopword(token))
        .map(|token| STEMMER.stem(token).to_string())
        .collect()
}

/// Tokenize without stemming, keeping tokens of length >= 2.
///
/// The TF-IDF vectorizer builds its 1-2-gram vocabulary over these.
pub fn tokenize_unstemmed(text: &str) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .filter(|token| token.len() >= 2 && !is_stopword(token))
        .map(|token| token.to_string())
        .collect()
}

/// Normalized single-string form (stemmed tokens joined by spaces)
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_strips_punctuation_and_lowercases() {
        let tokens = tokenize("UPI payment FAILED with error-5003!");
        assert!(tokens.contains(&"upi".to_string()));
        assert!(tokens.contains(&"5003".to_string()));
        // "with" is a stopword
        assert!(!tokens.iter().any(|t| t == "with"));
    }

    #[test]
    fn test_drops_short_tokens() {
        let tokens = tokenize("pg is up on v2");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_stemming() {
        let tokens = tokenize("payments failing transactions");
        assert!(tokens.contains(&"payment".to_string()));
        assert!(tokens.contains(&"fail".to_string()));
        assert!(tokens.contains(&"transact".to_string()));
    }

    #[test]
    fn test_deterministic() {
        let input = "Webhook signature mismatch on callback";
        assert_eq!(tokenize(input), tokenize(input));
    }

    #[test]
    fn test_stopword_only_input() {
        assert!(tokenize("what is the that with from").is_empty());
    }

    #[test]
    fn test_unstemmed_keeps_surface_forms() {
        let tokens = tokenize_unstemmed("refunds failing");
        assert_eq!(tokens, vec!["refunds".to_string(), "failing".to_string()]);
    }
}
