//! Final report synthesis.
//!
//! The synthesizer picks a model tier for the query, trims its inputs to
//! that tier's budget, asks for a section outline, and then for the
//! markdown report. Ranking-style questions ("top", "best", ...) get an
//! outline and report prompt built around a numbered list.
//!
//! A failed outline request falls back to [`FALLBACK_OUTLINE`]. A failed
//! report request yields [`REPORT_ERROR`] as the report body.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::budget::TokenBudget;
use super::config::ResearchConfig;
use super::message::{ChatRequest, system_message, user_message};
use super::prompt::{FALLBACK_OUTLINE, PromptSet, build_outline_prompt, build_report_prompt};
use super::provider::LlmProvider;
use super::tier::{ModelSelector, TierSet, TierSpec};
use crate::error::ResearchError;

/// Report body returned when report generation fails.
pub const REPORT_ERROR: &str = "Error generating research report";

/// Maximum tokens for the outline completion.
const OUTLINE_MAX_TOKENS: u32 = 512;

static RANKING_TERMS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:top|best|ranking|rated|popular)\b").ok());

/// Returns `true` when `query` asks for an ordered or top-N answer.
#[must_use]
pub fn is_ranking_query(query: &str) -> bool {
    RANKING_TERMS.as_ref().is_some_and(|re| re.is_match(query))
}

/// Builds the final research report.
pub struct ReportSynthesizer {
    selector: ModelSelector,
    tiers: TierSet,
    budget: Arc<TokenBudget>,
    max_tokens: u32,
    outline_prompt: String,
    ranked_prompt: String,
    report_prompt: String,
}

impl ReportSynthesizer {
    /// Creates a synthesizer from configuration and a prompt set.
    #[must_use]
    pub fn new(config: &ResearchConfig, budget: Arc<TokenBudget>, prompts: &PromptSet) -> Self {
        Self {
            selector: ModelSelector::new(config, prompts.selector.clone()),
            tiers: config.tiers.clone(),
            budget,
            max_tokens: config.report_max_tokens,
            outline_prompt: prompts.outline.clone(),
            ranked_prompt: prompts.ranked_report.clone(),
            report_prompt: prompts.report.clone(),
        }
    }

    /// Produces the markdown report. Never fails.
    pub async fn synthesize(
        &self,
        llm: &dyn LlmProvider,
        query: &str,
        findings: &[String],
        urls: &[String],
    ) -> String {
        let ranking = is_ranking_query(query);
        let tier = self.selector.select(llm, query).await.into_inner();
        let spec = self.tiers.spec(tier);

        let query = self.budget.trim(query, tier);
        let findings: Vec<String> = findings.iter().map(|f| self.budget.trim(f, tier)).collect();
        let urls: Vec<String> = urls.iter().map(|u| self.budget.trim(u, tier)).collect();

        tracing::debug!(
            %tier,
            ranking,
            findings = findings.len(),
            urls = urls.len(),
            "synthesizing report"
        );

        let outline = match self.outline(llm, spec, &query, &findings, ranking).await {
            Ok(outline) if !outline.trim().is_empty() => outline,
            Ok(_) => {
                tracing::warn!("outline response was empty, using fallback outline");
                FALLBACK_OUTLINE.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "outline request failed, using fallback outline");
                FALLBACK_OUTLINE.to_string()
            }
        };

        match self
            .report(llm, spec, &query, &outline, &findings, &urls, ranking)
            .await
        {
            Ok(report) if !report.trim().is_empty() => report,
            Ok(_) => {
                tracing::warn!("report response was empty");
                REPORT_ERROR.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "report generation failed");
                REPORT_ERROR.to_string()
            }
        }
    }

    async fn outline(
        &self,
        llm: &dyn LlmProvider,
        spec: &TierSpec,
        query: &str,
        findings: &[String],
        ranking: bool,
    ) -> Result<String, ResearchError> {
        let request = ChatRequest {
            model: spec.model.clone(),
            messages: vec![
                system_message(&self.outline_prompt),
                user_message(&build_outline_prompt(query, findings, ranking)),
            ],
            temperature: None,
            max_tokens: Some(OUTLINE_MAX_TOKENS),
            json_mode: false,
            response_schema: None,
        };
        Ok(llm.chat(&request).await?.content)
    }

    #[allow(clippy::too_many_arguments)]
    async fn report(
        &self,
        llm: &dyn LlmProvider,
        spec: &TierSpec,
        query: &str,
        outline: &str,
        findings: &[String],
        urls: &[String],
        ranking: bool,
    ) -> Result<String, ResearchError> {
        let system_prompt = if ranking {
            &self.ranked_prompt
        } else {
            &self.report_prompt
        };
        let request = ChatRequest {
            model: spec.model.clone(),
            messages: vec![
                system_message(system_prompt),
                user_message(&build_report_prompt(query, outline, findings, urls)),
            ],
            temperature: None,
            max_tokens: Some(self.max_tokens),
            json_mode: false,
            response_schema: None,
        };
        Ok(llm.chat(&request).await?.content)
    }
}

impl std::fmt::Debug for ReportSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSynthesizer")
            .field("selector", &self.selector)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::research::testing::{ScriptedLlm, Stage};

    fn synthesizer() -> ReportSynthesizer {
        let config = ResearchConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let budget = Arc::new(TokenBudget::without_tokenizer(config.tiers.clone()));
        ReportSynthesizer::new(&config, budget, &PromptSet::defaults())
    }

    fn findings() -> Vec<String> {
        vec!["Helix is modal".to_string(), "Zed is fast".to_string()]
    }

    fn urls() -> Vec<String> {
        vec!["https://helix.example".to_string()]
    }

    #[test_case("Top 10 programming languages", true ; "top")]
    #[test_case("What are the BEST hiking trails?", true ; "best uppercase")]
    #[test_case("highest-rated sci-fi novels", true ; "rated hyphenated")]
    #[test_case("most popular databases in 2024", true ; "popular")]
    #[test_case("university ranking methodology", true ; "ranking")]
    #[test_case("What is the capital of France?", false ; "factual")]
    #[test_case("history of topology", false ; "embedded top")]
    #[test_case("popularity of rust", false ; "embedded popular")]
    fn test_is_ranking_query(query: &str, expected: bool) {
        assert_eq!(is_ranking_query(query), expected);
    }

    #[tokio::test]
    async fn test_synthesize_ranking_uses_ranked_prompt() {
        let llm = ScriptedLlm::routed(|stage, _| match stage {
            Stage::Selector => Ok(r#"{"tier": "deep"}"#.to_string()),
            Stage::Outline => Ok("Summary\nRanking\nSources".to_string()),
            Stage::RankedReport => Ok("# Best editors\n1. **Helix**".to_string()),
            _ => Err("unexpected stage".to_string()),
        });
        let report = synthesizer()
            .synthesize(&llm, "best code editors", &findings(), &urls())
            .await;
        assert_eq!(report, "# Best editors\n1. **Helix**");

        assert_eq!(
            llm.stages(),
            vec![Stage::Selector, Stage::Outline, Stage::RankedReport]
        );
        let requests = llm.requests();
        assert!(requests[1].messages[1].content.contains("numbered"));
        assert_eq!(requests[2].model, "o3-mini");
        let user = &requests[2].messages[1].content;
        assert!(user.contains("Summary\nRanking\nSources"));
        assert!(user.contains("- https://helix.example"));
    }

    #[tokio::test]
    async fn test_synthesize_general_uses_report_prompt() {
        let llm = ScriptedLlm::routed(|stage, _| match stage {
            Stage::Selector => Ok(r#"{"tier": "fast"}"#.to_string()),
            Stage::Outline => Ok("Intro\nBody".to_string()),
            Stage::Report => Ok("# Report".to_string()),
            _ => Err("unexpected stage".to_string()),
        });
        let report = synthesizer()
            .synthesize(&llm, "how do editors parse code", &findings(), &urls())
            .await;
        assert_eq!(report, "# Report");
        assert_eq!(llm.requests()[2].model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_outline_failure_uses_fallback() {
        let llm = ScriptedLlm::routed(|stage, _| match stage {
            Stage::Selector => Ok(r#"{"tier": "balanced"}"#.to_string()),
            Stage::Outline => Err("outline down".to_string()),
            _ => Ok("# Report".to_string()),
        });
        let report = synthesizer()
            .synthesize(&llm, "q", &findings(), &urls())
            .await;
        assert_eq!(report, "# Report");
        let user = &llm.requests()[2].messages[1].content;
        assert!(user.contains(FALLBACK_OUTLINE));
    }

    #[tokio::test]
    async fn test_report_failure_returns_sentinel() {
        let llm = ScriptedLlm::routed(|stage, _| match stage {
            Stage::Report | Stage::RankedReport => Err("report down".to_string()),
            _ => Ok("{}".to_string()),
        });
        let report = synthesizer()
            .synthesize(&llm, "q", &findings(), &urls())
            .await;
        assert_eq!(report, REPORT_ERROR);
    }

    #[tokio::test]
    async fn test_selector_failure_defaults_to_balanced() {
        let llm = ScriptedLlm::routed(|stage, _| match stage {
            Stage::Selector => Err("selector down".to_string()),
            _ => Ok("text".to_string()),
        });
        synthesizer()
            .synthesize(&llm, "q", &findings(), &urls())
            .await;
        assert_eq!(llm.requests()[1].model, "gpt-4o");
    }
}
