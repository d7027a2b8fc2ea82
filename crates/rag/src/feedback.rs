//! Feedback log
//!
//! Operator verdicts on responses, kept in a bounded in-process ring buffer
//! for evaluation. Persisting these further is an ingestion concern outside
//! the core.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use sherlock_config::constants::cache::FEEDBACK_CAPACITY;

/// Operator verdict on a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedbackVerdict {
    Up,
    Down,
    Neutral,
}

/// One logged feedback record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub rag_strategy: String,
    pub query_complexity: String,
    pub retrieved_incident_ids: Vec<String>,
    pub confidence_score: f32,
    pub execution_time_ms: f64,
    pub verdict: FeedbackVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub helpful: bool,
}

/// Bounded ring buffer of feedback entries
#[derive(Default)]
pub struct FeedbackLog {
    entries: Mutex<VecDeque<FeedbackEntry>>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: FeedbackEntry) {
        tracing::info!(
            query = %entry.query,
            verdict = ?entry.verdict,
            helpful = entry.helpful,
            strategy = %entry.rag_strategy,
            "Feedback logged"
        );
        let mut entries = self.entries.lock();
        if entries.len() >= FEEDBACK_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Fraction of entries marked helpful; `None` when no feedback exists
    pub fn helpful_ratio(&self) -> Option<f32> {
        let entries = self.entries.lock();
        if entries.is_empty() {
            return None;
        }
        let helpful = entries.iter().filter(|e| e.helpful).count();
        Some(helpful as f32 / entries.len() as f32)
    }
}
