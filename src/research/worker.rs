//! Search and finding extraction for a single query.
//!
//! [`SearchWorker::run`] never fails. Every failure is folded into the
//! returned [`Extraction`] as a sentinel or error finding so the round in
//! progress can continue.

use std::fmt::Write;
use std::sync::Arc;

use super::budget::TokenBudget;
use super::config::ResearchConfig;
use super::decode::list_items;
use super::message::{ChatRequest, system_message, user_message};
use super::prompt::build_extraction_prompt;
use super::provider::{LlmProvider, SearchHit, SearchOptions, SearchProvider, SearchResponse};
use super::tier::ModelTier;
use crate::error::ResearchError;

/// Finding returned when the search produced nothing usable.
pub const NO_RESULTS_FINDING: &str = "No relevant information found.";

/// Finding returned when extraction produced no lines.
pub const NO_FINDINGS_FINDING: &str = "Analysis completed but no clear findings extracted.";

/// Maximum tokens for one extraction completion.
const EXTRACTION_MAX_TOKENS: u32 = 4096;

/// Findings and source URLs produced for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted findings; never empty.
    pub findings: Vec<String>,
    /// Source URLs in result order.
    pub urls: Vec<String>,
}

impl Extraction {
    fn sentinel(finding: &str, urls: Vec<String>) -> Self {
        Self {
            findings: vec![finding.to_string()],
            urls,
        }
    }

    fn failed(query: &str, error: &ResearchError, urls: Vec<String>) -> Self {
        let mut finding = format!("Error researching \"{query}\": {error}");
        if !urls.is_empty() {
            let _ = write!(finding, " (sources: {})", urls.join(", "));
        }
        Self {
            findings: vec![finding],
            urls,
        }
    }
}

/// Runs one search and extracts findings from its results.
pub struct SearchWorker {
    tier: ModelTier,
    model: String,
    options: SearchOptions,
    budget: Arc<TokenBudget>,
    system_prompt: String,
}

impl SearchWorker {
    /// Creates a worker that extracts with the configured extraction tier.
    #[must_use]
    pub fn new(config: &ResearchConfig, budget: Arc<TokenBudget>, system_prompt: String) -> Self {
        Self {
            tier: config.extraction_tier,
            model: config.tiers.spec(config.extraction_tier).model.clone(),
            options: config.search,
            budget,
            system_prompt,
        }
    }

    /// Searches for `query` and extracts findings.
    pub async fn run(
        &self,
        search: &dyn SearchProvider,
        llm: &dyn LlmProvider,
        query: &str,
    ) -> Extraction {
        let response = match self.search(search, query).await {
            Ok(response) => response,
            Err(ResearchError::InvalidResponse { message }) => {
                tracing::warn!(query, %message, "search response had an invalid shape");
                return Extraction::sentinel(NO_RESULTS_FINDING, Vec::new());
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "search failed");
                return Extraction::failed(query, &e, Vec::new());
            }
        };

        if !response.success || response.data.is_empty() {
            tracing::debug!(
                query,
                success = response.success,
                "search returned no usable results"
            );
            return Extraction::sentinel(NO_RESULTS_FINDING, Vec::new());
        }

        let urls: Vec<String> = response.data.iter().map(|hit| hit.url.clone()).collect();
        let context = self.budget.trim(&render_context(&response.data), self.tier);

        match self.extract(llm, query, &context).await {
            Ok(findings) if findings.is_empty() => {
                tracing::debug!(query, "extraction produced no findings");
                Extraction::sentinel(NO_FINDINGS_FINDING, urls)
            }
            Ok(findings) => {
                tracing::debug!(query, findings = findings.len(), urls = urls.len(), "extracted findings");
                Extraction { findings, urls }
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "finding extraction failed");
                Extraction::failed(query, &e, urls)
            }
        }
    }

    async fn search(
        &self,
        search: &dyn SearchProvider,
        query: &str,
    ) -> Result<SearchResponse, ResearchError> {
        tokio::time::timeout(self.options.wait, search.search(query, &self.options))
            .await
            .map_err(|_| ResearchError::Timeout {
                operation: "search",
                secs: self.options.wait.as_secs(),
            })?
    }

    async fn extract(
        &self,
        llm: &dyn LlmProvider,
        query: &str,
        context: &str,
    ) -> Result<Vec<String>, ResearchError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&build_extraction_prompt(query, context)),
            ],
            temperature: None,
            max_tokens: Some(EXTRACTION_MAX_TOKENS),
            json_mode: false,
            response_schema: None,
        };
        let response = llm.chat(&request).await?;
        Ok(list_items(&response.content))
    }
}

/// Renders search hits as `title` / `description` blocks.
fn render_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("{}\n{}", hit.title.trim(), hit.description.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl std::fmt::Debug for SearchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchWorker")
            .field("tier", &self.tier)
            .field("model", &self.model)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
