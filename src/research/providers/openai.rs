//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`ResearchConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;

use crate::error::ResearchError;
use crate::research::config::ResearchConfig;
use crate::research::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::research::provider::LlmProvider;

/// `OpenAI`-compatible LLM provider.
///
/// Wraps the `async-openai` client for chat completions. Requests are
/// bounded by [`ResearchConfig::timeout`].
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a new provider from research configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: &ResearchConfig) -> Result<Self, ResearchError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResearchError::ApiRequest {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Chooses the response format: a strict schema wins over plain JSON mode.
    fn response_format(request: &ChatRequest) -> Option<ResponseFormat> {
        if let Some(ref schema) = request.response_schema {
            return Some(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(true),
                },
            });
        }
        request.json_mode.then_some(ResponseFormat::JsonObject)
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            response_format: Self::response_format(request),
            ..Default::default()
        }
    }

    fn map_error(e: OpenAIError) -> ResearchError {
        let status = match &e {
            OpenAIError::Reqwest(inner) => inner.status().map(|s| s.as_u16()),
            _ => None,
        };
        ResearchError::ApiRequest {
            message: e.to_string(),
            status,
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ResearchError> {
        let openai_request = Self::build_request(request);

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(Self::map_error)?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        tracing::trace!(
            model = %request.model,
            total_tokens = usage.total_tokens,
            finish_reason = finish_reason.as_deref().unwrap_or("none"),
            "chat completion"
        );

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::research::message::{self, ResponseSchema};
    use crate::research::tier::TierResponse;

    fn request(json_mode: bool, schema: Option<ResponseSchema>) -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                message::system_message("sys"),
                message::user_message("test"),
            ],
            temperature: Some(0.0),
            max_tokens: Some(100),
            json_mode,
            response_schema: schema,
        }
    }

    #[test]
    fn test_convert_messages() {
        let system = OpenAiProvider::convert_message(&message::system_message("s"));
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));
        let user = OpenAiProvider::convert_message(&message::user_message("u"));
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));
        let assistant = OpenAiProvider::convert_message(&ChatMessage {
            role: Role::Assistant,
            content: "a".to_string(),
        });
        assert!(matches!(assistant, ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_build_request_plain() {
        let built = OpenAiProvider::build_request(&request(false, None));
        assert!(built.response_format.is_none());
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.max_completion_tokens, Some(100));
    }

    #[test]
    fn test_build_request_json_mode() {
        let built = OpenAiProvider::build_request(&request(true, None));
        assert!(matches!(built.response_format, Some(ResponseFormat::JsonObject)));
    }

    #[test]
    fn test_build_request_schema_wins() {
        let schema = ResponseSchema::of::<TierResponse>("model_tier");
        let built = OpenAiProvider::build_request(&request(true, Some(schema)));
        match built.response_format {
            Some(ResponseFormat::JsonSchema { json_schema }) => {
                assert_eq!(json_schema.name, "model_tier");
                assert_eq!(json_schema.strict, Some(true));
            }
            other => unreachable!("unexpected format: {other:?}"),
        }
    }

    fn provider(base_url: &str) -> OpenAiProvider {
        let config = ResearchConfig::builder()
            .api_key("test-key")
            .base_url(base_url)
            .build()
            .unwrap_or_else(|_| unreachable!());
        OpenAiProvider::new(&config).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn test_chat_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"tier\": \"fast\"}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .chat(&request(true, None))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.content, r#"{"tier": "fast"}"#);
        assert_eq!(response.usage.total_tokens, 17);
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_chat_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "message": "bad model",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            })))
            .mount(&server)
            .await;

        let result = provider(&server.uri()).chat(&request(false, None)).await;
        assert!(matches!(result, Err(ResearchError::ApiRequest { .. })));
    }
}
