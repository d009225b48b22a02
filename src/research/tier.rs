//! Model tiers and per-call-site tier selection.
//!
//! A [`ModelTier`] names an LLM configuration (model + token budget).
//! [`ModelSelector`] classifies a query's complexity with one LLM call and
//! maps it to a tier; anything unexpected resolves to
//! [`ModelTier::Balanced`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::config::ResearchConfig;
use super::decode::{Decoded, decode_json};
use super::message::{ChatRequest, ResponseSchema, system_message, user_message};
use super::provider::LlmProvider;

/// Complexity tier of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Simple or time-sensitive questions.
    Fast,
    /// Multi-faceted or comparative questions.
    Balanced,
    /// Technical, multi-domain, or deep-reasoning questions.
    Deep,
}

impl ModelTier {
    /// Parses a tier name (case-insensitive). Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Some(Self::Fast),
            "balanced" => Some(Self::Balanced),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Deep => "deep",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model identifier and token budget bound to a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    /// Model identifier.
    pub model: String,
    /// Context token budget.
    pub budget: usize,
}

/// The three tier configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    /// FAST tier.
    pub fast: TierSpec,
    /// BALANCED tier.
    pub balanced: TierSpec,
    /// DEEP tier.
    pub deep: TierSpec,
}

impl TierSet {
    /// Returns the configuration for `tier`.
    #[must_use]
    pub const fn spec(&self, tier: ModelTier) -> &TierSpec {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Balanced => &self.balanced,
            ModelTier::Deep => &self.deep,
        }
    }
}

/// Classification response schema.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TierResponse {
    /// One of `fast`, `balanced`, `deep`.
    pub tier: String,
}

/// Selects a [`ModelTier`] for a query.
pub struct ModelSelector {
    model: String,
    system_prompt: String,
}

impl ModelSelector {
    /// Creates a selector that classifies with the FAST tier model.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.tiers.fast.model.clone(),
            system_prompt,
        }
    }

    /// Classifies `query`. Never fails; degrades to BALANCED.
    pub async fn select(&self, provider: &dyn LlmProvider, query: &str) -> Decoded<ModelTier> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&format!("<query>{query}</query>")),
            ],
            temperature: Some(0.0),
            max_tokens: Some(64),
            json_mode: true,
            response_schema: Some(ResponseSchema::of::<TierResponse>("model_tier")),
        };

        let decoded = match provider.chat(&request).await {
            Ok(response) => Self::parse_tier(&response.content),
            Err(e) => {
                tracing::warn!(error = %e, "tier selection failed, using balanced");
                Decoded::Fallback(ModelTier::Balanced)
            }
        };
        tracing::debug!(
            tier = %decoded.into_inner(),
            fallback = decoded.is_fallback(),
            "selected model tier"
        );
        decoded
    }

    fn parse_tier(content: &str) -> Decoded<ModelTier> {
        decode_json::<Option<TierResponse>>(content, None)
            .and_then(ModelTier::Balanced, |r| r.and_then(|r| ModelTier::parse(&r.tier)))
    }
}

impl std::fmt::Debug for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSelector")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
