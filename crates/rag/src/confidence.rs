//! Confidence scoring
//!
//! Derives a confidence value from the retained candidates and the
//! complexity label. The orchestrator enforces the hard floor separately;
//! this module only computes the score.

use sherlock_config::constants::confidence;
use sherlock_core::{QueryComplexity, RetrievedIncident};

/// Confidence in [0, 1]; 0.0 for an empty candidate set.
///
/// SIMPLE leans on the top score, COMPLEX on the average of the top three,
/// UNKNOWN discounts the top score. Agreement across two or more retrieval
/// methods on the top candidate earns a small bonus.
pub fn score_confidence(candidates: &[RetrievedIncident], complexity: QueryComplexity) -> f32 {
    let Some(top) = candidates.first() else {
        return 0.0;
    };

    let mut score = match complexity {
        QueryComplexity::Simple => (top.fused_score * confidence::SIMPLE_FACTOR).min(1.0),
        QueryComplexity::Complex => {
            let n = candidates.len().min(confidence::COMPLEX_TOP_N);
            let avg: f32 =
                candidates[..n].iter().map(|c| c.fused_score).sum::<f32>() / n as f32;
            (avg * confidence::COMPLEX_FACTOR).min(1.0)
        }
        QueryComplexity::Unknown => (top.fused_score * confidence::UNKNOWN_FACTOR).min(1.0),
    };

    if top.method_count > 1 {
        score = (score * confidence::AGREEMENT_FACTOR).min(1.0);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use sherlock_core::Incident;

    fn candidate(fused: f32, method_count: usize) -> RetrievedIncident {
        let mut r = RetrievedIncident::exact(Incident {
            id: "JSP-1".to_string(),
            title: "t".to_string(),
            description: String::new(),
            resolution: String::new(),
            tags: vec![],
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        });
        r.fused_score = fused;
        r.method_count = method_count;
        r
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(score_confidence(&[], QueryComplexity::Simple), 0.0);
    }

    #[test]
    fn test_simple_scales_top() {
        let score = score_confidence(&[candidate(0.5, 1)], QueryComplexity::Simple);
        assert!((score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_simple_caps_at_one() {
        let score = score_confidence(&[candidate(0.95, 1)], QueryComplexity::Simple);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_complex_averages_top_three() {
        let candidates = vec![
            candidate(0.9, 1),
            candidate(0.6, 1),
            candidate(0.3, 1),
            candidate(0.1, 1),
        ];
        let score = score_confidence(&candidates, QueryComplexity::Complex);
        let expected = (0.9f32 + 0.6 + 0.3) / 3.0 * 1.1;
        assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_discounts() {
        let score = score_confidence(&[candidate(0.5, 1)], QueryComplexity::Unknown);
        assert!((score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_agreement_bonus() {
        let single = score_confidence(&[candidate(0.5, 1)], QueryComplexity::Simple);
        let agreed = score_confidence(&[candidate(0.5, 2)], QueryComplexity::Simple);
        assert!((agreed - single * 1.1).abs() < 1e-6);
    }
}
