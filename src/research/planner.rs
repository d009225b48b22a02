//! Parameter planning.
//!
//! [`ParameterPlanner`] asks the FAST model how wide and deep a session
//! should go. Whatever comes back is rounded and clamped; any failure
//! yields [`ResearchParameters::default`].

use schemars::JsonSchema;
use serde::Deserialize;

use super::config::ResearchConfig;
use super::decode::{Decoded, decode_json};
use super::message::{ChatRequest, ResponseSchema, system_message, user_message};
use super::prompt::build_planner_prompt;
use super::provider::LlmProvider;
use super::request::{ResearchParameters, SpeedHint};

/// Planner response schema. Values are unbounded until clamped.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct PlannerResponse {
    /// Queries per round.
    pub breadth: f64,
    /// Number of rounds.
    pub depth: f64,
}

/// Derives [`ResearchParameters`] for a query.
pub struct ParameterPlanner {
    model: String,
    system_prompt: String,
}

impl ParameterPlanner {
    /// Creates a planner that uses the FAST tier model.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.tiers.fast.model.clone(),
            system_prompt,
        }
    }

    /// Plans breadth and depth for `query`. Never fails.
    pub async fn plan(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        speed: Option<SpeedHint>,
    ) -> Decoded<ResearchParameters> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&build_planner_prompt(query, speed)),
            ],
            temperature: Some(0.0),
            max_tokens: Some(128),
            json_mode: true,
            response_schema: Some(ResponseSchema::of::<PlannerResponse>("research_parameters")),
        };

        let decoded = match provider.chat(&request).await {
            Ok(response) => Self::parse_parameters(&response.content),
            Err(e) => {
                tracing::warn!(error = %e, "parameter planning failed, using defaults");
                Decoded::Fallback(ResearchParameters::default())
            }
        };

        let params = decoded.into_inner();
        if decoded.is_fallback() {
            tracing::warn!(
                breadth = params.breadth,
                depth = params.depth,
                "planner output unusable, using default parameters"
            );
        } else {
            tracing::debug!(
                breadth = params.breadth,
                depth = params.depth,
                "planned research parameters"
            );
        }
        decoded
    }

    fn parse_parameters(content: &str) -> Decoded<ResearchParameters> {
        decode_json::<Option<PlannerResponse>>(content, None).and_then(
            ResearchParameters::default(),
            |r| r.and_then(|r| ResearchParameters::from_raw(r.breadth, r.depth)),
        )
    }
}

impl std::fmt::Debug for ParameterPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterPlanner")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::research::testing::ScriptedLlm;

    fn planner() -> ParameterPlanner {
        let config = ResearchConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        ParameterPlanner::new(&config, "plan".to_string())
    }

    #[test]
    fn test_parse_valid() {
        let decoded = ParameterPlanner::parse_parameters(r#"{"breadth": 3, "depth": 2}"#);
        assert_eq!(
            decoded,
            Decoded::Parsed(ResearchParameters {
                breadth: 3,
                depth: 2
            })
        );
    }

    #[test]
    fn test_parse_out_of_range_is_clamped() {
        let decoded = ParameterPlanner::parse_parameters(r#"{"breadth": 40, "depth": 0}"#);
        assert_eq!(
            decoded,
            Decoded::Parsed(ResearchParameters {
                breadth: 10,
                depth: 1
            })
        );
    }

    #[test]
    fn test_parse_fractional_is_rounded() {
        let decoded = ParameterPlanner::parse_parameters(r#"{"breadth": 4.6, "depth": 2.4}"#);
        assert_eq!(
            decoded.into_inner(),
            ResearchParameters {
                breadth: 5,
                depth: 2
            }
        );
    }

    #[test]
    fn test_parse_missing_field_uses_default() {
        let decoded = ParameterPlanner::parse_parameters(r#"{"breadth": 6}"#);
        assert_eq!(decoded, Decoded::Fallback(ResearchParameters::default()));
    }

    #[test]
    fn test_parse_string_values_use_default() {
        let decoded = ParameterPlanner::parse_parameters(r#"{"breadth": "wide", "depth": 2}"#);
        assert!(decoded.is_fallback());
    }

    #[tokio::test]
    async fn test_plan_provider_failure() {
        let llm = ScriptedLlm::new().fail("rate limited");
        let params = planner().plan(&llm, "q", None).await;
        assert_eq!(params, Decoded::Fallback(ResearchParameters::default()));
    }

    #[tokio::test]
    async fn test_plan_sends_speed_hint() {
        let llm = ScriptedLlm::new().reply(r#"{"breadth": 2, "depth": 1}"#);
        let params = planner().plan(&llm, "q", Some(SpeedHint::Fast)).await;
        assert_eq!(params.into_inner().total(), 2);

        let requests = llm.requests();
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert!(requests[0].messages[1].content.contains("fast"));
        assert_eq!(
            requests[0]
                .response_schema
                .as_ref()
                .map(|s| s.name.as_str()),
            Some("research_parameters")
        );
    }

    proptest! {
        #[test]
        fn prop_parameters_always_in_range(breadth in -1e6_f64..1e6, depth in -1e6_f64..1e6) {
            let content = format!(r#"{{"breadth": {breadth}, "depth": {depth}}}"#);
            let params = ParameterPlanner::parse_parameters(&content).into_inner();
            prop_assert!((2..=10).contains(&params.breadth));
            prop_assert!((1..=5).contains(&params.depth));
        }
    }
}
