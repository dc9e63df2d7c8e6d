//! GeminiProvider -- native [`LlmProvider`] for the Gemini `generateContent`
//! REST API.
//!
//! The API key travels in the `x-goog-api-key` header and is held in a
//! [`SecretString`] that is only exposed while building a request.

pub mod streaming;
pub mod types;

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use agentdeck_core::llm::provider::LlmProvider;
use agentdeck_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderKind, StreamEvent, Usage,
};

use self::streaming::create_gemini_stream;
use self::types::{
    GeminiContent, GeminiErrorEnvelope, GeminiPart, GeminiRequest, GeminiResponse,
    GenerationConfig,
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider.
///
/// Intentionally does not derive Debug.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, DEFAULT_GEMINI_BASE_URL)
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(api_key: SecretString, base_url: &str) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Unknown(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

/// Convert a generic [`CompletionRequest`] into a [`GeminiRequest`].
pub(crate) fn to_gemini_request(request: &CompletionRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(
                match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart {
                text: m.content.clone(),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction: request.system.as_ref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: system.clone(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

/// Map a non-success HTTP answer to [`LlmError`].
pub(crate) fn classify_error(status: u16, body: &str, retry_after_ms: Option<u64>) -> LlmError {
    let parsed = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|e| e.error)
        .unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.to_string()
    } else {
        parsed.message
    };

    if status == 429 || parsed.status == "RESOURCE_EXHAUSTED" || message.contains("quota") {
        LlmError::RateLimited { retry_after_ms }
    } else if status == 401 || status == 403 || message.contains("API key") {
        LlmError::AuthenticationFailed
    } else if status == 400 {
        LlmError::InvalidRequest(message)
    } else {
        LlmError::Unknown(format!("HTTP {status}: {message}"))
    }
}

/// `Retry-After` in whole seconds, as milliseconds.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

/// Turn a parsed `generateContent` body into a [`CompletionResponse`].
pub(crate) fn into_completion(
    response: GeminiResponse,
    requested_model: &str,
) -> Result<CompletionResponse, LlmError> {
    if let Some(reason) = response.block_reason() {
        return Err(LlmError::ContentFiltered(reason));
    }

    let usage = response
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: response.text(),
        model: response
            .model_version
            .clone()
            .unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = to_gemini_request(request);

        let response = self
            .client
            .post(self.url(&request.model, "generateContent"))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unknown(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &error_body, retry_after));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unknown(format!("failed to parse response: {e}")))?;

        let completion = into_completion(parsed, &request.model)?;

        tracing::info!(
            provider = "gemini",
            model = %completion.model,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "completion finished"
        );

        Ok(completion)
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let builder = self
            .client
            .post(format!(
                "{}?alt=sse",
                self.url(&request.model, "streamGenerateContent")
            ))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&to_gemini_request(&request));

        create_gemini_stream(builder)
    }
}
