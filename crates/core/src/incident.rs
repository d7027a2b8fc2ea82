//! Incident records
//!
//! The canonical unit of retrieval: a historical support/engineering ticket
//! with a resolution. Records are immutable after ingestion; ids are stored
//! canonical upper-case and looked up case-insensitively.

use serde::{Deserialize, Serialize};

/// An error code/message pair surfaced into assembled context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorPattern {
    /// Render as `"<code> <message>"` with empty halves elided
    pub fn display(&self) -> String {
        format!("{} {}", self.code, self.message).trim().to_string()
    }
}

/// A historical incident record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// External identifier, e.g. `JSP-1046` or `SLACK-1699999999-42`
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resolution: String,
    /// Short labels used for filtering and boosting; unordered
    #[serde(default)]
    pub tags: Vec<String>,
    /// Calendar date of creation
    #[serde(default)]
    pub created_at: String,
    /// Free-text identity of the resolver
    #[serde(default)]
    pub resolved_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_patterns: Option<Vec<ErrorPattern>>,
}

impl Incident {
    /// Searchable text for the keyword indices.
    ///
    /// Weights title x3 and tags x2 by repetition, then appends description,
    /// resolution, and the resolver identity.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for _ in 0..3 {
            if !self.title.is_empty() {
                parts.push(&self.title);
            }
        }
        if !self.description.is_empty() {
            parts.push(&self.description);
        }
        if !self.resolution.is_empty() {
            parts.push(&self.resolution);
        }

        let tag_text = self.tags.join(" ");
        let mut text = parts.join(" ");
        for _ in 0..2 {
            if !tag_text.is_empty() {
                text.push(' ');
                text.push_str(&tag_text);
            }
        }
        if !self.resolved_by.is_empty() {
            text.push(' ');
            text.push_str(&self.resolved_by);
        }
        text
    }

    /// Title + description + tags, used by entity/domain matching
    pub fn combined_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.tags.join(" "))
    }

    /// Canonical upper-case form of the id
    pub fn canonical_id(&self) -> String {
        self.id.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Incident {
        Incident {
            id: "JSP-1046".to_string(),
            title: "Webhook signature mismatch".to_string(),
            description: "Callback rejected".to_string(),
            resolution: "Rotated the signing key".to_string(),
            tags: vec!["webhook".to_string(), "signature".to_string()],
            created_at: "2024-03-01".to_string(),
            resolved_by: "asha".to_string(),
            error_patterns: None,
        }
    }

    #[test]
    fn test_searchable_text_weights_title_and_tags() {
        let text = sample().searchable_text();
        assert_eq!(text.matches("Webhook signature mismatch").count(), 3);
        assert_eq!(text.matches("webhook signature").count(), 2);
        assert!(text.contains("Callback rejected"));
        assert!(text.contains("asha"));
    }

    #[test]
    fn test_searchable_text_empty_fields() {
        let incident = Incident {
            id: "JSP-1".to_string(),
            title: String::new(),
            description: String::new(),
            resolution: String::new(),
            tags: vec![],
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        };
        assert!(incident.searchable_text().is_empty());
    }

    #[test]
    fn test_deserialize_with_missing_optionals() {
        let incident: Incident =
            serde_json::from_str(r#"{"id": "jsp-7", "title": "UPI timeout"}"#).unwrap();
        assert_eq!(incident.canonical_id(), "JSP-7");
        assert!(incident.tags.is_empty());
        assert!(incident.error_patterns.is_none());
    }
}
