//! Okapi BM25 index
//!
//! Term-frequency tables built once over the tokenized corpus and kept
//! serializable for the disk cache. Raw scores are returned as-is; they are
//! min-max normalized at the fusion layer, never here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sherlock_config::constants::retrieval::{BM25_B, BM25_K1};

/// Okapi BM25 tables: term -> document frequency, per-document term
/// frequencies, and document lengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Index {
    k1: f64,
    b: f64,
    doc_freqs: HashMap<String, usize>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
}

impl Bm25Index {
    /// Build the index from a tokenized corpus. An empty corpus yields an
    /// empty index whose scoring returns no results.
    pub fn build(corpus: &[Vec<String>]) -> Self {
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());

        for tokens in corpus {
            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len());
            term_freqs.push(tf);
        }

        let avgdl = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().map(|&l| l as f64).sum::<f64>() / doc_lens.len() as f64
        };

        Self {
            k1: BM25_K1,
            b: BM25_B,
            doc_freqs,
            term_freqs,
            doc_lens,
            avgdl,
        }
    }

    pub fn doc_count(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    pub fn vocab_size(&self) -> usize {
        self.doc_freqs.len()
    }

    /// idf(t) = ln(1 + (N - df + 0.5) / (df + 0.5)), always positive
    fn idf(&self, term: &str) -> f64 {
        let df = *self.doc_freqs.get(term).unwrap_or(&0);
        if df == 0 {
            return 0.0;
        }
        let n = self.doc_count() as f64;
        let numerator = n - df as f64 + 0.5;
        let denominator = df as f64 + 0.5;
        (1.0 + numerator / denominator).ln()
    }

    /// Raw BM25 score of every document against the query tokens
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        if self.is_empty() || query_tokens.is_empty() || self.avgdl == 0.0 {
            return vec![0.0; self.doc_count()];
        }

        let idfs: HashMap<&str, f64> = query_tokens
            .iter()
            .map(|t| (t.as_str(), self.idf(t)))
            .collect();

        self.term_freqs
            .iter()
            .zip(self.doc_lens.iter())
            .map(|(tf, &doc_len)| {
                let mut score = 0.0;
                for token in query_tokens {
                    let freq = *tf.get(token.as_str()).unwrap_or(&0) as f64;
                    if freq == 0.0 {
                        continue;
                    }
                    let idf = idfs[token.as_str()];
                    let norm = self.k1 * (1.0 - self.b + self.b * doc_len as f64 / self.avgdl);
                    score += idf * freq * (self.k1 + 1.0) / (freq + norm);
                }
                score
            })
            .collect()
    }

    /// Top-k documents with score > 0, sorted by descending score and then
    /// ascending document index for stability.
    pub fn top_k(&self, query_tokens: &[String], k: usize) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .scores(query_tokens)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sherlock_text_processing::tokenize;

    fn build_index(docs: &[&str]) -> Bm25Index {
        let corpus: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();
        Bm25Index::build(&corpus)
    }

    #[test]
    fn test_empty_corpus() {
        let index = Bm25Index::build(&[]);
        assert!(index.is_empty());
        assert!(index.top_k(&tokenize("upi timeout"), 5).is_empty());
    }

    #[test]
    fn test_ranks_matching_doc_first() {
        let index = build_index(&[
            "UPI payment failed with error 5003",
            "Webhook signature mismatch on callback",
            "Card tokenization declined by issuer",
        ]);

        let results = index.top_k(&tokenize("upi error 5003"), 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn test_more_matching_terms_score_higher() {
        let index = build_index(&[
            "gateway timeout during authorization processing",
            "gateway timeout",
            "gateway maintenance window",
        ]);

        let results = index.top_k(&tokenize("gateway timeout authorization"), 3);
        assert_eq!(results[0].0, 0);
        let doc1 = results.iter().find(|(i, _)| *i == 1).unwrap();
        assert!(results[0].1 > doc1.1);
    }

    #[test]
    fn test_no_overlap_yields_empty() {
        let index = build_index(&["refund settlement delayed"]);
        assert!(index.top_k(&tokenize("kubernetes deployment"), 5).is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let index = build_index(&["upi failure", "card failure"]);
        let json = serde_json::to_string(&index).unwrap();
        let back: Bm25Index = serde_json::from_str(&json).unwrap();
        assert_eq!(back.doc_count(), 2);
        assert_eq!(
            back.top_k(&tokenize("upi failure"), 2),
            index.top_k(&tokenize("upi failure"), 2)
        );
    }
}
