//! HTTP endpoints
//!
//! Thin REST surface over the RAG service; all behavior lives in the core.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sherlock_core::Incident;
use sherlock_rag::FeedbackVerdict;

use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(process_query))
        .route("/api/feedback", post(log_feedback))
        .route("/api/index/build", post(build_indices))
        .route("/api/suggestions", get(suggestions))
        .route("/api/metrics", get(rag_metrics))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

async fn process_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<serde_json::Value> {
    let start = std::time::Instant::now();
    let response = state.service.process_query(&request.query).await;

    metrics::counter!("sherlock_queries_total").increment(1);
    metrics::histogram!("sherlock_query_duration_ms")
        .record(start.elapsed().as_secs_f64() * 1000.0);

    Json(serde_json::json!({ "result": response }))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    query: String,
    verdict: FeedbackVerdict,
    #[serde(default)]
    comment: Option<String>,
    helpful: bool,
}

/// Feedback arrives detached from the original response object, so the
/// query is re-processed (hitting the classifier cache) to reconstruct the
/// response it refers to.
async fn log_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Json<serde_json::Value> {
    let response = state.service.process_query(&request.query).await;
    let logged = state.service.log_feedback(
        &request.query,
        &response,
        request.verdict,
        request.comment,
        request.helpful,
    );
    metrics::counter!("sherlock_feedback_total").increment(1);
    Json(serde_json::json!({ "logged": logged }))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BuildRequest {
    Wrapped { issues: Vec<Incident> },
    Plain(Vec<Incident>),
}

impl BuildRequest {
    fn into_incidents(self) -> Vec<Incident> {
        match self {
            BuildRequest::Wrapped { issues } => issues,
            BuildRequest::Plain(incidents) => incidents,
        }
    }
}

async fn build_indices(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let incidents = request.into_incidents();
    let count = incidents.len();
    let ok = state.service.build_indices(incidents).await;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(serde_json::json!({ "success": ok, "incidents": count })),
    )
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    q: String,
    #[serde(default = "default_suggestion_limit")]
    limit: usize,
}

fn default_suggestion_limit() -> usize {
    5
}

async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsQuery>,
) -> Json<serde_json::Value> {
    let suggestions = state.service.suggestions(&params.q, params.limit);
    Json(serde_json::json!({ "suggestions": suggestions }))
}

async fn rag_metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metrics = state.service.metrics();
    Json(serde_json::json!(metrics))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let report = state.service.health_check().await;
    let status = if report.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(serde_json::json!(report)))
}
