//! Follow-up query generation.

use super::config::ResearchConfig;
use super::decode::list_items;
use super::message::{ChatRequest, system_message, user_message};
use super::provider::LlmProvider;

/// Produces follow-up queries for a processed query.
pub struct QueryExpander {
    model: String,
    max_follow_ups: usize,
    system_prompt: String,
}

impl QueryExpander {
    /// Creates an expander that uses the FAST tier model.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.tiers.fast.model.clone(),
            max_follow_ups: config.max_follow_ups,
            system_prompt,
        }
    }

    /// Returns at most `max_follow_ups` follow-up queries for `query`.
    ///
    /// Returns an empty list when the provider fails.
    pub async fn expand(&self, provider: &dyn LlmProvider, query: &str) -> Vec<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&format!("<query>{query}</query>")),
            ],
            temperature: Some(0.7),
            max_tokens: Some(256),
            json_mode: false,
            response_schema: None,
        };

        match provider.chat(&request).await {
            Ok(response) => {
                let mut follow_ups = list_items(&response.content);
                follow_ups.truncate(self.max_follow_ups);
                tracing::debug!(query, count = follow_ups.len(), "expanded query");
                follow_ups
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "query expansion failed");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for QueryExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExpander")
            .field("model", &self.model)
            .field("max_follow_ups", &self.max_follow_ups)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::ScriptedLlm;

    fn expander() -> QueryExpander {
        let config = ResearchConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        QueryExpander::new(&config, "expand".to_string())
    }

    #[tokio::test]
    async fn test_expand_caps_at_three() {
        let llm = ScriptedLlm::new().reply("1. a\n2. b\n3. c\n4. d\n5. e");
        let follow_ups = expander().expand(&llm, "q").await;
        assert_eq!(follow_ups, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_expand_strips_markers_and_blank_lines() {
        let llm = ScriptedLlm::new().reply("\n- rust 2024 edition\n\n2) borrow checker changes\n");
        let follow_ups = expander().expand(&llm, "q").await;
        assert_eq!(
            follow_ups,
            vec!["rust 2024 edition", "borrow checker changes"]
        );
    }

    #[tokio::test]
    async fn test_expand_failure_is_empty() {
        let llm = ScriptedLlm::new().fail("timeout");
        assert!(expander().expand(&llm, "q").await.is_empty());
    }

    #[tokio::test]
    async fn test_expand_oversized_cap_still_returns_three() {
        let config = ResearchConfig::builder()
            .api_key("test")
            .max_follow_ups(10)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let expander = QueryExpander::new(&config, "expand".to_string());
        let llm = ScriptedLlm::new().reply("1. a\n2. b\n3. c\n4. d\n5. e");
        assert_eq!(expander.expand(&llm, "q").await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_expand_respects_configured_cap() {
        let config = ResearchConfig::builder()
            .api_key("test")
            .max_follow_ups(1)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let expander = QueryExpander::new(&config, "expand".to_string());
        let llm = ScriptedLlm::new().reply("1. a\n2. b");
        assert_eq!(expander.expand(&llm, "q").await, vec!["a"]);
    }
}
