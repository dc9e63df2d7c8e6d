//! OpenAI provider built on [`async_openai`].
//!
//! Translates the provider-agnostic [`CompletionRequest`] into a Chat
//! Completions request and maps every `async-openai` failure into the
//! [`LlmError`] taxonomy before it leaves this module.

use std::pin::Pin;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, FinishReason,
};
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use agentdeck_core::llm::provider::LlmProvider;
use agentdeck_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderKind, StreamEvent, Usage,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI Chat Completions provider.
///
/// Does NOT derive Debug: the `async_openai::Client` carries the API key.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_base_url(api_key: SecretString, base_url: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url.trim_end_matches('/'));

        Self {
            client: Client::with_config(config),
        }
    }
}

/// Convert a generic [`CompletionRequest`] into an OpenAI request.
pub(crate) fn build_request(request: &CompletionRequest, stream: bool) -> CreateChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system) = &request.system {
        messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                name: None,
            },
        ));
    }

    for msg in &request.messages {
        let mapped = match msg.role {
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::Assistant => {
                #[allow(deprecated)]
                let assistant = ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    refusal: None,
                    name: None,
                    audio: None,
                    tool_calls: None,
                    function_call: None,
                };
                ChatCompletionRequestMessage::Assistant(assistant)
            }
        };
        messages.push(mapped);
    }

    let mut req = CreateChatCompletionRequest {
        model: request.model.clone(),
        messages,
        max_completion_tokens: Some(request.max_tokens),
        temperature: request.temperature.map(|t| t as f32),
        ..Default::default()
    };

    if stream {
        req.stream = Some(true);
        req.stream_options = Some(ChatCompletionStreamOptions {
            include_usage: Some(true),
            include_obfuscation: None,
        });
    }

    req
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let req = build_request(request, false);

        let response = self
            .client
            .chat()
            .create(req)
            .await
            .map_err(map_openai_error)?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::Unknown("response contained no choices".to_string()))?;

        if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
            return Err(LlmError::ContentFiltered(
                "completion stopped by the content filter".to_string(),
            ));
        }

        let content = choice.message.content.clone().unwrap_or_default();
        let usage = response
            .usage
            .as_ref()
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        tracing::info!(
            provider = "openai",
            model = %response.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "completion finished"
        );

        Ok(CompletionResponse {
            content,
            model: response.model,
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let client = self.client.clone();
        let req = build_request(&request, true);

        Box::pin(async_stream::try_stream! {
            let mut stream = client
                .chat()
                .create_stream(req)
                .await
                .map_err(map_openai_error)?;

            while let Some(result) = stream.next().await {
                let chunk = result.map_err(map_openai_error)?;

                // The usage chunk arrives last with an empty choices array.
                if let Some(usage) = &chunk.usage {
                    yield StreamEvent::Usage(Usage {
                        prompt_tokens: usage.prompt_tokens,
                        completion_tokens: usage.completion_tokens,
                    });
                }

                for choice in &chunk.choices {
                    let text = choice.delta.content.clone().unwrap_or_default();
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text };
                    }
                    if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
                        Err::<(), _>(LlmError::ContentFiltered(
                            "completion stopped by the content filter".to_string(),
                        ))?;
                    }
                }
            }

            yield StreamEvent::Done;
        })
    }
}

/// Map an `async-openai` error to the normalized [`LlmError`].
fn map_openai_error(err: OpenAIError) -> LlmError {
    match &err {
        OpenAIError::ApiError(api_err) => classify_api_error(
            api_err.code.as_deref().unwrap_or(""),
            api_err.r#type.as_deref().unwrap_or(""),
            &api_err.message,
        ),
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(400) => LlmError::InvalidRequest(err.to_string()),
            _ => LlmError::Unknown(err.to_string()),
        },
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Unknown(err.to_string()),
    }
}

/// Classify an OpenAI API error body by its `code`, `type` and message.
fn classify_api_error(code: &str, error_type: &str, message: &str) -> LlmError {
    if code == "invalid_api_key"
        || error_type == "authentication_error"
        || message.contains("Incorrect API key")
    {
        LlmError::AuthenticationFailed
    } else if code == "rate_limit_exceeded"
        || code == "insufficient_quota"
        || error_type == "insufficient_quota"
        || error_type == "rate_limit_error"
    {
        LlmError::RateLimited {
            retry_after_ms: None,
        }
    } else if code == "content_filter" || code == "content_policy_violation" {
        LlmError::ContentFiltered(message.to_string())
    } else if error_type == "invalid_request_error" {
        LlmError::InvalidRequest(message.to_string())
    } else {
        LlmError::Unknown(message.to_string())
    }
}
