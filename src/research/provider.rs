//! Pluggable provider traits.
//!
//! [`LlmProvider`] and [`SearchProvider`] are the two external
//! collaborators the research pipeline consumes. Implementations are
//! constructed once per process and shared across sessions behind `Arc`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::message::{ChatRequest, ChatResponse};
use crate::error::ResearchError;

/// Trait for LLM provider backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls)
/// for a specific provider while presenting a uniform interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ResearchError>;
}

/// Options for a single search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub limit: usize,
    /// How long the caller waits for the call as a whole.
    pub wait: Duration,
    /// Timeout forwarded to the provider.
    pub timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            wait: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source URL.
    pub url: String,
    /// Page title.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Short description or snippet.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

/// Decodes an optional string, treating `null` like a missing key.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A validated search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Whether the provider reported success.
    pub success: bool,
    /// Result entries.
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

/// Trait for web search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name (e.g., `"firecrawl"`).
    fn name(&self) -> &'static str;

    /// Runs one search.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::InvalidResponse`] when the body does not
    /// match [`SearchResponse`], and other variants on transport failure.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, ResearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_options_default() {
        let opts = SearchOptions::default();
        assert_eq!(opts.limit, 5);
        assert_eq!(opts.wait, Duration::from_secs(30));
        assert_eq!(opts.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_search_response_lenient_fields() {
        let json = r#"{"success": true, "data": [{"url": "https://a.example"}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert!(resp.success);
        assert_eq!(resp.data[0].url, "https://a.example");
        assert!(resp.data[0].title.is_empty());
    }

    #[test]
    fn test_search_response_missing_url_rejected() {
        let json = r#"{"success": true, "data": [{"title": "x"}]}"#;
        assert!(serde_json::from_str::<SearchResponse>(json).is_err());
    }
}
