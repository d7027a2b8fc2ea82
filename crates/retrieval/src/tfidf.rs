//! TF-IDF vectorizer and cosine ranker
//!
//! 1-2-gram vocabulary capped at 5,000 features, stop-word filtered,
//! min-df 1 / max-df 0.95. Rows are L2-normalized so scoring reduces to a
//! sparse dot product. Vectorizer and matrix serialize together with the
//! corpus metadata as one cache generation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sherlock_config::constants::retrieval::{TFIDF_MAX_DF, TFIDF_MAX_FEATURES};
use sherlock_text_processing::tokenize_unstemmed;

/// Fitted vocabulary and idf weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
    n_docs: usize,
}

/// Unigrams plus bigrams over the unstemmed token stream
fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize_unstemmed(text);
    let mut grams = tokens.clone();
    for window in tokens.windows(2) {
        grams.push(format!("{} {}", window[0], window[1]));
    }
    grams
}

impl TfidfVectorizer {
    /// Fit the vocabulary over raw documents.
    ///
    /// Terms above the max-df ceiling are pruned unless pruning would empty
    /// the vocabulary (degenerate corpora keep everything). When more than
    /// `TFIDF_MAX_FEATURES` terms remain, the most frequent across the
    /// corpus are kept, ties broken alphabetically.
    pub fn fit(documents: &[String]) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let grams = ngrams(doc);
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for gram in &grams {
                *seen.entry(gram.as_str()).or_insert(0) += 1;
            }
            for (gram, count) in seen {
                *doc_freq.entry(gram.to_string()).or_insert(0) += 1;
                *total_freq.entry(gram.to_string()).or_insert(0) += count;
            }
        }

        let max_doc_count = TFIDF_MAX_DF * n_docs as f64;
        let mut kept: Vec<(&String, usize)> = doc_freq
            .iter()
            .map(|(term, df)| (term, *df))
            .filter(|(_, df)| (*df as f64) <= max_doc_count)
            .collect();
        if kept.is_empty() && !doc_freq.is_empty() {
            tracing::debug!("max-df pruning removed every term, keeping full vocabulary");
            kept = doc_freq.iter().map(|(term, df)| (term, *df)).collect();
        }

        if kept.len() > TFIDF_MAX_FEATURES {
            kept.sort_by(|a, b| {
                total_freq[b.0]
                    .cmp(&total_freq[a.0])
                    .then_with(|| a.0.cmp(b.0))
            });
            kept.truncate(TFIDF_MAX_FEATURES);
        }
        kept.sort_by(|a, b| a.0.cmp(b.0));

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, df)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.clone(), index as u32);
            // Smoothed idf, never zero
            idf.push((((1 + n_docs) as f64) / ((1 + df) as f64)).ln() + 1.0);
        }

        Self {
            vocabulary,
            idf,
            n_docs,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.vocabulary.len()
    }

    /// Transform a text into a sorted, L2-normalized sparse vector
    pub fn transform(&self, text: &str) -> Vec<(u32, f64)> {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for gram in ngrams(text) {
            if let Some(&index) = self.vocabulary.get(&gram) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut row: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index as usize]))
            .collect();
        row.sort_by_key(|(index, _)| *index);

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }
}

/// Vectorizer plus the document matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfIndex {
    pub vectorizer: TfidfVectorizer,
    matrix: Vec<Vec<(u32, f64)>>,
}

fn sparse_dot(a: &[(u32, f64)], b: &[(u32, f64)]) -> f64 {
    let mut sum = 0.0;
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

impl TfidfIndex {
    pub fn build(documents: &[String]) -> Self {
        let vectorizer = TfidfVectorizer::fit(documents);
        let matrix = documents
            .iter()
            .map(|doc| vectorizer.transform(doc))
            .collect();
        Self { vectorizer, matrix }
    }

    pub fn doc_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.vectorizer.feature_count()
    }

    /// Cosine similarity of the query against every document
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let query_vector = self.vectorizer.transform(query);
        if query_vector.is_empty() {
            return vec![0.0; self.doc_count()];
        }
        self.matrix
            .iter()
            .map(|row| sparse_dot(&query_vector, row))
            .collect()
    }

    /// Top-k documents above the minimum cosine threshold, descending,
    /// ascending document index on ties.
    pub fn top_k(&self, query: &str, k: usize, min_cosine: f64) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .scores(query)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > min_cosine)
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

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_empty_corpus() {
        let index = TfidfIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.top_k("upi timeout", 5, 0.01).is_empty());
    }

    #[test]
    fn test_single_document_corpus_keeps_vocabulary() {
        let index = TfidfIndex::build(&docs(&["UPI payment failed with error 5003"]));
        assert!(index.feature_count() > 0);
        let results = index.top_k("upi payment error", 3, 0.01);
        assert_eq!(results.len(), 1);
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn test_exact_document_scores_near_one() {
        let index = TfidfIndex::build(&docs(&[
            "webhook signature mismatch on callback",
            "refund settlement delayed at bank",
        ]));
        let results = index.top_k("webhook signature mismatch on callback", 2, 0.01);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.95);
    }

    #[test]
    fn test_bigrams_contribute() {
        let vectorizer = TfidfVectorizer::fit(&docs(&["gateway timeout observed"]));
        assert!(vectorizer.vocabulary.contains_key("gateway timeout"));
    }

    #[test]
    fn test_unrelated_query_below_threshold() {
        let index = TfidfIndex::build(&docs(&["card tokenization declined"]));
        assert!(index.top_k("kubernetes deployment", 5, 0.01).is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let index = TfidfIndex::build(&docs(&["upi failure", "card failure"]));
        let json = serde_json::to_string(&index).unwrap();
        let back: TfidfIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.doc_count(), 2);
        assert_eq!(back.top_k("upi", 2, 0.0), index.top_k("upi", 2, 0.0));
    }
}
