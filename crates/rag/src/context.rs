//! Context assembly
//!
//! Turns retained incidents into the evidence block the generator is
//! grounded on, plus the parallel source citations. Ordering always equals
//! the retriever's final ordering.

use sherlock_config::constants::generation::SOURCE_TITLE_CHARS;
use sherlock_core::RetrievedIncident;

const BLOCK_SEPARATOR: &str = "\n--------------------------------------------------\n";

/// One evidence block per incident, joined by a separator line
pub fn build_context(incidents: &[RetrievedIncident]) -> String {
    if incidents.is_empty() {
        return "No relevant incidents found.".to_string();
    }

    let blocks: Vec<String> = incidents
        .iter()
        .enumerate()
        .map(|(index, retrieved)| {
            let incident = &retrieved.incident;
            let mut block = format!(
                "INCIDENT {n}:\nID: {id}\nTitle: {title}\nDescription: {description}\nResolution: {resolution}\nTags: {tags}\nSimilarity Score: {score:.3}",
                n = index + 1,
                id = incident.id,
                title = incident.title,
                description = incident.description,
                resolution = incident.resolution,
                tags = incident.tags.join(", "),
                score = retrieved.fused_score,
            );

            if let Some(patterns) = &incident.error_patterns {
                let rendered: Vec<String> = patterns
                    .iter()
                    .map(|p| p.display())
                    .filter(|p| !p.is_empty())
                    .collect();
                if !rendered.is_empty() {
                    block.push_str(&format!("\nError Patterns: {}", rendered.join(", ")));
                }
            }

            if !retrieved.search_methods.is_empty() {
                let methods: Vec<&str> =
                    retrieved.search_methods.iter().map(|m| m.as_str()).collect();
                block.push_str(&format!("\nFound by: {}", methods.join(", ")));
            }

            block
        })
        .collect();

    blocks.join(BLOCK_SEPARATOR)
}

/// `"[<id>] <title truncated> (Score: <s.sss>)"` per incident, same order
pub fn build_sources(incidents: &[RetrievedIncident]) -> Vec<String> {
    incidents
        .iter()
        .map(|retrieved| {
            let title = &retrieved.incident.title;
            let truncated: String = title.chars().take(SOURCE_TITLE_CHARS).collect();
            let ellipsis = if title.chars().count() > SOURCE_TITLE_CHARS {
                "..."
            } else {
                ""
            };
            format!(
                "[{id}] {truncated}{ellipsis} (Score: {score:.3})",
                id = retrieved.incident.id,
                score = retrieved.fused_score,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sherlock_core::{ErrorPattern, Incident, SearchMethod};

    fn retrieved(id: &str, title: &str, score: f32) -> RetrievedIncident {
        let mut r = RetrievedIncident::exact(Incident {
            id: id.to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            resolution: "fix".to_string(),
            tags: vec!["upi".to_string()],
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: Some(vec![ErrorPattern {
                code: "5003".to_string(),
                message: "collect expired".to_string(),
            }]),
        });
        r.fused_score = score;
        r.search_methods = vec![SearchMethod::Semantic, SearchMethod::Bm25];
        r
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(build_context(&[]), "No relevant incidents found.");
        assert!(build_sources(&[]).is_empty());
    }

    #[test]
    fn test_block_contents() {
        let context = build_context(&[retrieved("JSP-1", "UPI failure", 0.8125)]);
        assert!(context.contains("INCIDENT 1:"));
        assert!(context.contains("ID: JSP-1"));
        assert!(context.contains("Similarity Score: 0.813"));
        assert!(context.contains("Error Patterns: 5003 collect expired"));
        assert!(context.contains("Found by: semantic, bm25"));
    }

    #[test]
    fn test_blocks_are_separated_and_ordered() {
        let context = build_context(&[
            retrieved("JSP-1", "first", 0.9),
            retrieved("JSP-2", "second", 0.5),
        ]);
        assert!(context.contains("INCIDENT 1:"));
        assert!(context.contains("INCIDENT 2:"));
        let first = context.find("JSP-1").unwrap();
        let second = context.find("JSP-2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_sources_format_and_truncation() {
        let long_title = "x".repeat(80);
        let sources = build_sources(&[retrieved("JSP-9", &long_title, 0.5)]);
        assert_eq!(sources.len(), 1);
        assert!(sources[0].starts_with("[JSP-9] "));
        assert!(sources[0].contains(&"x".repeat(60)));
        assert!(!sources[0].contains(&"x".repeat(61)));
        assert!(sources[0].contains("... (Score: 0.500)"));
    }
}
