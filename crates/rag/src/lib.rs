//! RAG pipeline
//!
//! Classify -> route -> retrieve -> validate -> generate -> emit. The
//! orchestrator in [`service`] is the only entry point; every failure mode
//! inside the pipeline degrades to a structured `RagResponse` rather than
//! an error.

pub mod classifier;
pub mod confidence;
pub mod context;
pub mod feedback;
pub mod generator;
pub mod relevance;
pub mod router;
pub mod service;

pub use classifier::QueryClassifier;
pub use confidence::score_confidence;
pub use context::{build_context, build_sources};
pub use feedback::{FeedbackEntry, FeedbackLog, FeedbackVerdict};
pub use generator::AnswerGenerator;
pub use relevance::{GateDecision, RejectReason, RelevanceGate, TrustReason};
pub use router::{QueryRouter, RouteDecision};
pub use service::{HealthReport, RagMetrics, RagService};

use thiserror::Error;

/// Pipeline-internal errors; none of these escape the orchestrator
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl From<RagError> for sherlock_core::Error {
    fn from(err: RagError) -> Self {
        sherlock_core::Error::Internal(err.to_string())
    }
}
