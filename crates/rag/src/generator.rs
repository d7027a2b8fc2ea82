//! Grounded answer generation
//!
//! Three prompt templates (exact-id summary, simple fix, complex analysis),
//! each carrying explicit anti-hallucination instructions and a token cap.
//! Every chat failure falls back to a deterministic string built from the
//! top candidate, so generation as a whole never fails.

use std::sync::Arc;

use sherlock_config::constants::generation;
use sherlock_core::{
    ChatModel, GenerationOptions, Incident, QueryComplexity, RetrievedIncident,
};

use crate::context::build_context;

const SIMPLE_PROMPT: &str = r#"You are Sherlock, a senior payments engineer.
Your job: use the provided context to generate a concise, actionable fix suggestion.

USER QUERY:
{query}

CONTEXT (Past Incidents):
{context}

INSTRUCTIONS:
- Generate a 1-sentence fix starting with "Fix Suggestion: "
- Base your answer ONLY on the provided context
- If the context is not relevant, say "No relevant past incidents found for this specific issue."
- NEVER make up information that is not in the context
- Prioritize incidents with higher similarity scores and matching tags

Fix Suggestion:"#;

const COMPLEX_PROMPT: &str = r#"You are Sherlock, a senior payments engineer with deep expertise in payment systems.
Your job: analyze multiple past incidents to provide comprehensive troubleshooting guidance.

USER QUERY:
{query}

CONTEXT (Multiple Past Incidents):
{context}

INSTRUCTIONS:
- Provide a structured analysis based on the incidents above
- Include: 1) Root cause patterns, 2) Step-by-step resolution, 3) Prevention measures
- Base your answer ONLY on the provided context
- If no clear patterns emerge, focus on the most relevant incident
- NEVER make up information that is not in the context
- Format as: "Analysis: [root cause] | Resolution: [steps] | Prevention: [measures]"

Analysis:"#;

const EXACT_ID_PROMPT: &str = r#"You are a senior engineer. Summarize this specific incident in exactly 1-2 sentences using ONLY the provided content. Be concise and technical.

Incident Title: {title}
Description: {description}
Resolution: {resolution}

Provide a 1-2 sentence summary that captures the core issue and solution:"#;

/// Prompt-template driven generator over a chat backend
pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max_chars).collect();
            format!("{cut}...")
        }
    }

    /// Deterministic fallback built from the top candidate
    fn fallback_answer(incidents: &[RetrievedIncident]) -> String {
        match incidents.first() {
            Some(top) => format!(
                "Fix Suggestion: Based on incident {}, try: {}",
                top.incident.id,
                Self::truncate(
                    &top.incident.resolution,
                    generation::FALLBACK_RESOLUTION_CHARS
                )
            ),
            None => {
                "No relevant past incidents found for this specific issue. Please consult your team or documentation.".to_string()
            }
        }
    }

    /// Generate the grounded answer for retained incidents; never fails
    pub async fn generate_answer(
        &self,
        query: &str,
        incidents: &[RetrievedIncident],
        complexity: QueryComplexity,
    ) -> String {
        let context = build_context(incidents);
        let (template, max_tokens) = match complexity {
            QueryComplexity::Complex => (COMPLEX_PROMPT, generation::COMPLEX_MAX_TOKENS),
            _ => (SIMPLE_PROMPT, generation::SIMPLE_MAX_TOKENS),
        };
        let prompt = template
            .replace("{query}", query)
            .replace("{context}", &context);
        let options = GenerationOptions::new(generation::LOW_TEMPERATURE, max_tokens);

        match self.chat.generate(&prompt, &options).await {
            Ok(answer) if !answer.trim().is_empty() => {
                tracing::info!(
                    query,
                    complexity = %complexity,
                    context_incidents = incidents.len(),
                    response_length = answer.len(),
                    "Generated grounded answer"
                );
                answer
            }
            Ok(_) => {
                tracing::warn!(query, "Chat model returned empty answer, using fallback");
                Self::fallback_answer(incidents)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Generation failed, using fallback");
                Self::fallback_answer(incidents)
            }
        }
    }

    /// 1-2 sentence summary for the exact-id branch, grounded only on the
    /// single incident's content
    pub async fn exact_summary(&self, incident: &Incident) -> String {
        let prompt = EXACT_ID_PROMPT
            .replace("{title}", &incident.title)
            .replace("{description}", &incident.description)
            .replace("{resolution}", &incident.resolution);
        let options = GenerationOptions::new(
            generation::LOW_TEMPERATURE,
            generation::EXACT_ID_MAX_TOKENS,
        );

        match self.chat.generate(&prompt, &options).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            _ => {
                tracing::warn!(id = %incident.id, "Exact summary fallback");
                format!(
                    "Issue: {}. Resolution: {}",
                    incident.title,
                    Self::truncate(
                        &incident.resolution,
                        generation::FALLBACK_RESOLUTION_CHARS
                    )
                )
            }
        }
    }

    /// Full answer body for a found exact-id lookup
    pub fn format_exact_response(incident: &Incident, summary: &str) -> String {
        let tags = if incident.tags.is_empty() {
            "None".to_string()
        } else {
            incident.tags.join(", ")
        };
        format!(
            "EXACT INCIDENT FOUND - {id}\n\n{title}\n\nSummary: {summary}\n\nDescription:\n{description}\n\nResolution:\n{resolution}\n\nResolved by: {resolved_by}\nDate: {created_at}\nTags: {tags}",
            id = incident.id,
            title = incident.title,
            summary = summary,
            description = incident.description,
            resolution = incident.resolution,
            resolved_by = if incident.resolved_by.is_empty() {
                "Unknown"
            } else {
                &incident.resolved_by
            },
            created_at = if incident.created_at.is_empty() {
                "Unknown"
            } else {
                &incident.created_at
            },
            tags = tags,
        )
    }

    /// Answer body when an id was extracted but no record exists
    pub fn not_found_answer(incident_id: &str) -> String {
        format!(
            "Incident Not Found\n\nIncident `{incident_id}` was not found in the knowledge base.\n\nPossible reasons:\n- The incident id may be incorrect\n- The incident is not yet indexed in the system\n- The incident may be from a different tracker\n\nWhat you can do:\n- Double-check the incident id\n- Try searching with keywords from the issue\n- Contact the team that created the incident"
        )
    }

    /// Honest "no relevant results" body with extracted keyword hints
    pub fn no_results_answer(query: &str) -> String {
        let skip: &[&str] = &[
            "with", "from", "that", "this", "have", "been", "were", "they", "there", "where",
            "when", "what", "which", "would", "could", "should",
        ];
        let lowered = query.to_lowercase();
        let keywords: Vec<String> = lowered
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
            .filter(|w| w.len() > 3 && !skip.contains(w))
            .take(5)
            .map(|w| w.to_string())
            .collect();

        let keyword_line = if keywords.is_empty() {
            "payment, integration, error".to_string()
        } else {
            keywords.join(", ")
        };

        format!(
            "No Relevant Historical Incidents Found\n\nNo past incidents closely related to this issue were found:\n\"{query}\"\n\nThis appears to be a new type of issue not well covered in the current knowledge base.\n\nRecommended next steps:\n- Contact the relevant integration team directly\n- Check official API documentation for the services mentioned\n- Review dashboard and configuration settings\n- Search internal documentation or team channels\n- Escalate to the team that owns the affected service\n\nKeywords for future searches: {keyword_line}\n\nOnce this issue is resolved, please document the solution so future engineers can benefit from it."
        )
    }

    /// Answer body for queries outside the payment domain
    pub fn domain_rejection_answer(query: &str) -> String {
        format!(
            "Out of Scope\n\nThis knowledge base covers payment-systems incidents, and the query does not appear to be payment-related:\n\"{query}\"\n\nTry rephrasing with payment terms (gateway, merchant, UPI, refund, webhook, ...) or consult the relevant platform team directly."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sherlock_core::Result;

    struct ScriptedChat(String);

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            Ok(self.0.clone())
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatModel for FailingChat {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            Err(sherlock_core::Error::Chat("down".to_string()))
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn incident() -> Incident {
        Incident {
            id: "JSP-1001".to_string(),
            title: "UPI payment failed with error 5003".to_string(),
            description: "Collect requests expired".to_string(),
            resolution: "Increased the PSP timeout and retried the collect flow".to_string(),
            tags: vec!["upi".to_string()],
            created_at: "2024-02-02".to_string(),
            resolved_by: "oncall".to_string(),
            error_patterns: None,
        }
    }

    fn retrieved() -> RetrievedIncident {
        RetrievedIncident::exact(incident())
    }

    #[tokio::test]
    async fn test_generate_uses_chat_answer() {
        let generator = AnswerGenerator::new(Arc::new(ScriptedChat(
            "Fix Suggestion: bump the PSP timeout".to_string(),
        )));
        let answer = generator
            .generate_answer("upi timeout", &[retrieved()], QueryComplexity::Simple)
            .await;
        assert_eq!(answer, "Fix Suggestion: bump the PSP timeout");
    }

    #[tokio::test]
    async fn test_chat_failure_falls_back_to_top_candidate() {
        let generator = AnswerGenerator::new(Arc::new(FailingChat));
        let answer = generator
            .generate_answer("upi timeout", &[retrieved()], QueryComplexity::Simple)
            .await;
        assert!(answer.starts_with("Fix Suggestion: Based on incident JSP-1001"));
        assert!(answer.contains("Increased the PSP timeout"));
    }

    #[tokio::test]
    async fn test_exact_summary_fallback() {
        let generator = AnswerGenerator::new(Arc::new(FailingChat));
        let summary = generator.exact_summary(&incident()).await;
        assert!(summary.starts_with("Issue: UPI payment failed with error 5003."));
    }

    #[test]
    fn test_exact_response_contains_record_fields() {
        let body = AnswerGenerator::format_exact_response(&incident(), "a short summary");
        assert!(body.contains("EXACT INCIDENT FOUND - JSP-1001"));
        assert!(body.contains("a short summary"));
        assert!(body.contains("Resolved by: oncall"));
        assert!(body.contains("Tags: upi"));
    }

    #[test]
    fn test_not_found_answer_names_the_id() {
        let body = AnswerGenerator::not_found_answer("JSP-1030");
        assert!(body.contains("JSP-1030"));
        assert!(body.contains("not found"));
    }

    #[test]
    fn test_no_results_answer_extracts_keywords() {
        let body = AnswerGenerator::no_results_answer("mystery payment gateway anomaly observed");
        assert!(body.contains("mystery"));
        assert!(body.contains("gateway"));
        assert!(!body.contains("Keywords for future searches: with"));
    }
}
