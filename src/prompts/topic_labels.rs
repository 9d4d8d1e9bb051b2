//! Topic labeling prompts for abstract classification.
//!
//! Contains system and user prompt templates for assigning catalog topic
//! codes to a paper abstract.

use crate::catalog::TopicCatalog;

/// System prompt for topic labeling
pub const SYSTEM_PROMPT: &str = r#"You are a computer-science paper classifier. Your task is to assign topic codes to a paper based ONLY on its abstract.

Rules you MUST follow:
- Only use codes from the provided topic list.
- Assign every topic the abstract clearly belongs to, usually one to three.
- Output an empty list when the abstract gives no clear signal; do not guess.
- Output MUST be valid JSON only (no extra text), for machine parsing.

Output format (strict JSON, no markdown):
{
  "topics": ["CODE1", "CODE2"]
}"#;

/// User prompt template for a single abstract
/// Placeholders: {topic_list}, {abstract_text}
pub const USER_PROMPT_TEMPLATE: &str = r#"Assign topic codes to the following abstract.

Topic list (code: name):
{topic_list}

Abstract:
{abstract_text}

Output strict JSON only (no markdown code blocks, no extra text):
{
  "topics": ["CODE1", ...]
}"#;

/// Render the catalog as one `CODE: name` line per topic.
pub fn render_topic_list(catalog: &TopicCatalog) -> String {
    catalog
        .iter()
        .map(|topic| format!("{}: {}", topic.code, topic.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build user prompt for one abstract
pub fn build_user_prompt(topic_list: &str, abstract_text: &str) -> String {
    USER_PROMPT_TEMPLATE
        .replace("{topic_list}", topic_list)
        .replace("{abstract_text}", abstract_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_prompt() {
        let topics = render_topic_list(&TopicCatalog::standard());
        assert!(topics.contains("DB: Databases"));
        assert_eq!(topics.lines().count(), 40);

        let prompt = build_user_prompt(&topics, "We index vectors.");
        assert!(prompt.contains("LG: Machine Learning"));
        assert!(prompt.contains("We index vectors."));
    }
}
