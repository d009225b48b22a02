//! Provider registry and factory.
//!
//! Maps configured provider names to concrete [`LlmProvider`] and
//! [`SearchProvider`] implementations. Providers are built once per
//! process and shared between sessions.

use std::sync::Arc;

use crate::error::ResearchError;
use crate::research::config::ResearchConfig;
use crate::research::provider::{LlmProvider, SearchProvider};
use crate::research::providers::{FirecrawlSearch, OpenAiProvider};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`ResearchError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &ResearchConfig) -> Result<Arc<dyn LlmProvider>, ResearchError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        other => Err(ResearchError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates a [`SearchProvider`] based on the configured search provider name.
///
/// # Supported Providers
///
/// - `"firecrawl"` (default)
///
/// # Errors
///
/// Returns [`ResearchError::UnsupportedProvider`] for unknown names and
/// [`ResearchError::SearchKeyMissing`] when no search key is configured.
pub fn create_search_provider(
    config: &ResearchConfig,
) -> Result<Arc<dyn SearchProvider>, ResearchError> {
    match config.search_provider.as_str() {
        "firecrawl" => Ok(Arc::new(FirecrawlSearch::new(config)?)),
        other => Err(ResearchError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
