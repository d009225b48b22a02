//! Firecrawl web search provider.
//!
//! Posts `{query, limit, timeout}` to `<base>/v1/search` and validates the
//! body against [`SearchResponse`].

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ResearchError;
use crate::research::config::ResearchConfig;
use crate::research::provider::{SearchOptions, SearchProvider, SearchResponse};

/// Default Firecrawl API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    limit: usize,
    /// Milliseconds.
    timeout: u64,
}

/// Firecrawl search client.
pub struct FirecrawlSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirecrawlSearch {
    /// Creates a client from research configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::SearchKeyMissing`] without a search API key.
    pub fn new(config: &ResearchConfig) -> Result<Self, ResearchError> {
        let api_key = config
            .search_api_key
            .clone()
            .ok_or(ResearchError::SearchKeyMissing)?;
        let base_url = config
            .search_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self::with_base_url(api_key, base_url))
    }

    /// Creates a client for an explicit endpoint.
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl std::fmt::Debug for FirecrawlSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlSearch")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, ResearchError> {
        let body = SearchBody {
            query,
            limit: options.limit,
            timeout: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
        };

        let response = self
            .client
            .post(format!("{}/v1/search", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Search {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ResearchError::ApiRequest {
                message: format!("firecrawl returned {status}: {message}"),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ResearchError::Search {
            message: e.to_string(),
        })?;
        let parsed: SearchResponse =
            serde_json::from_slice(&bytes).map_err(|e| ResearchError::InvalidResponse {
                message: e.to_string(),
            })?;

        tracing::debug!(query, results = parsed.data.len(), success = parsed.success, "firecrawl search");
        Ok(parsed)
    }
}
