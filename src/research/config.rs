//! Research configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use super::provider::SearchOptions;
use super::tier::{ModelTier, TierSet, TierSpec};
use crate::error::ResearchError;

/// Default model for the FAST tier.
const DEFAULT_FAST_MODEL: &str = "gpt-4o-mini";
/// Default model for the BALANCED tier.
const DEFAULT_BALANCED_MODEL: &str = "gpt-4o";
/// Default model for the DEEP tier.
const DEFAULT_DEEP_MODEL: &str = "o3-mini";
/// Token budget for FAST and BALANCED tiers.
const DEFAULT_STANDARD_BUDGET: usize = 16_000;
/// Token budget for the DEEP tier.
const DEFAULT_DEEP_BUDGET: usize = 128_000;
/// Default search result cap.
const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Default search wait and provider timeout in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
/// Default maximum follow-up queries per expansion.
const DEFAULT_MAX_FOLLOW_UPS: usize = 3;
/// Default report max tokens.
const DEFAULT_REPORT_MAX_TOKENS: u32 = 8192;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the research pipeline.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the LLM provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Search provider name (e.g., "firecrawl").
    pub search_provider: String,
    /// API key for the search provider.
    pub search_api_key: Option<String>,
    /// Optional search base URL override.
    pub search_base_url: Option<String>,
    /// Model identifier and token budget for each tier.
    pub tiers: TierSet,
    /// Tier used for extraction trimming and the extraction call.
    pub extraction_tier: ModelTier,
    /// Options for every search call.
    pub search: SearchOptions,
    /// Maximum follow-up queries produced per expansion.
    pub max_follow_ups: usize,
    /// Maximum tokens for the final report.
    pub report_max_tokens: u32,
    /// Request timeout for LLM calls.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
}

impl ResearchConfig {
    /// Creates a new builder for `ResearchConfig`.
    #[must_use]
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, ResearchError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`ResearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResearchConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    search_provider: Option<String>,
    search_api_key: Option<String>,
    search_base_url: Option<String>,
    fast_model: Option<String>,
    balanced_model: Option<String>,
    deep_model: Option<String>,
    fast_budget: Option<usize>,
    balanced_budget: Option<usize>,
    deep_budget: Option<usize>,
    extraction_tier: Option<ModelTier>,
    search_limit: Option<usize>,
    search_timeout: Option<Duration>,
    max_follow_ups: Option<usize>,
    report_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl ResearchConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RESEARCH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("RESEARCH_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("RESEARCH_BASE_URL"))
                .ok();
        }
        if self.search_provider.is_none() {
            self.search_provider = std::env::var("RESEARCH_SEARCH_PROVIDER").ok();
        }
        if self.search_api_key.is_none() {
            self.search_api_key = std::env::var("FIRECRAWL_API_KEY")
                .or_else(|_| std::env::var("RESEARCH_SEARCH_API_KEY"))
                .ok();
        }
        if self.search_base_url.is_none() {
            self.search_base_url = std::env::var("FIRECRAWL_BASE_URL")
                .or_else(|_| std::env::var("RESEARCH_SEARCH_BASE_URL"))
                .ok();
        }
        if self.fast_model.is_none() {
            self.fast_model = std::env::var("RESEARCH_FAST_MODEL").ok();
        }
        if self.balanced_model.is_none() {
            self.balanced_model = std::env::var("RESEARCH_BALANCED_MODEL").ok();
        }
        if self.deep_model.is_none() {
            self.deep_model = std::env::var("RESEARCH_DEEP_MODEL").ok();
        }
        if self.max_follow_ups.is_none() {
            self.max_follow_ups = env_parse("RESEARCH_MAX_FOLLOW_UPS");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RESEARCH_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the LLM API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the LLM base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the search provider name.
    #[must_use]
    pub fn search_provider(mut self, provider: impl Into<String>) -> Self {
        self.search_provider = Some(provider.into());
        self
    }

    /// Sets the search API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the search base URL override.
    #[must_use]
    pub fn search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Sets the FAST tier model.
    #[must_use]
    pub fn fast_model(mut self, model: impl Into<String>) -> Self {
        self.fast_model = Some(model.into());
        self
    }

    /// Sets the BALANCED tier model.
    #[must_use]
    pub fn balanced_model(mut self, model: impl Into<String>) -> Self {
        self.balanced_model = Some(model.into());
        self
    }

    /// Sets the DEEP tier model.
    #[must_use]
    pub fn deep_model(mut self, model: impl Into<String>) -> Self {
        self.deep_model = Some(model.into());
        self
    }

    /// Sets the token budget for a tier.
    #[must_use]
    pub const fn tier_budget(mut self, tier: ModelTier, budget: usize) -> Self {
        match tier {
            ModelTier::Fast => self.fast_budget = Some(budget),
            ModelTier::Balanced => self.balanced_budget = Some(budget),
            ModelTier::Deep => self.deep_budget = Some(budget),
        }
        self
    }

    /// Sets the tier used for finding extraction.
    #[must_use]
    pub const fn extraction_tier(mut self, tier: ModelTier) -> Self {
        self.extraction_tier = Some(tier);
        self
    }

    /// Sets the search result cap.
    #[must_use]
    pub const fn search_limit(mut self, n: usize) -> Self {
        self.search_limit = Some(n);
        self
    }

    /// Sets the search wait and provider timeout.
    #[must_use]
    pub const fn search_timeout(mut self, duration: Duration) -> Self {
        self.search_timeout = Some(duration);
        self
    }

    /// Sets the maximum number of follow-up queries per expansion.
    ///
    /// Values above 3 are clamped to 3 by [`build`](Self::build).
    #[must_use]
    pub const fn max_follow_ups(mut self, n: usize) -> Self {
        self.max_follow_ups = Some(n);
        self
    }

    /// Sets the report max tokens.
    #[must_use]
    pub const fn report_max_tokens(mut self, n: u32) -> Self {
        self.report_max_tokens = Some(n);
        self
    }

    /// Sets the LLM request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`ResearchConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<ResearchConfig, ResearchError> {
        let api_key = self.api_key.ok_or(ResearchError::ApiKeyMissing)?;

        let tiers = TierSet {
            fast: TierSpec {
                model: self
                    .fast_model
                    .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
                budget: self.fast_budget.unwrap_or(DEFAULT_STANDARD_BUDGET),
            },
            balanced: TierSpec {
                model: self
                    .balanced_model
                    .unwrap_or_else(|| DEFAULT_BALANCED_MODEL.to_string()),
                budget: self.balanced_budget.unwrap_or(DEFAULT_STANDARD_BUDGET),
            },
            deep: TierSpec {
                model: self
                    .deep_model
                    .unwrap_or_else(|| DEFAULT_DEEP_MODEL.to_string()),
                budget: self.deep_budget.unwrap_or(DEFAULT_DEEP_BUDGET),
            },
        };

        let search_timeout = self
            .search_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS));

        Ok(ResearchConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            search_provider: self
                .search_provider
                .unwrap_or_else(|| "firecrawl".to_string()),
            search_api_key: self.search_api_key,
            search_base_url: self.search_base_url,
            tiers,
            extraction_tier: self.extraction_tier.unwrap_or(ModelTier::Deep),
            search: SearchOptions {
                limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                wait: search_timeout,
                timeout: search_timeout,
            },
            max_follow_ups: self
                .max_follow_ups
                .map_or(DEFAULT_MAX_FOLLOW_UPS, |n| n.min(DEFAULT_MAX_FOLLOW_UPS)),
            report_max_tokens: self
                .report_max_tokens
                .unwrap_or(DEFAULT_REPORT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        })
    }
}
