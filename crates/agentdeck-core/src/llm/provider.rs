//! LlmProvider trait definition.
//!
//! This is the core abstraction every generation backend implements.
//! Uses RPITIT for `complete`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use agentdeck_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderKind, StreamEvent};

/// Trait for text-generation backends (OpenAI, Gemini).
///
/// Implementations live in agentdeck-infra and must map every
/// provider-specific failure into [`LlmError`].
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Which provider tag this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request.
    ///
    /// The returned stream is lazy: nothing goes over the wire until it is
    /// first polled. It yields text deltas, an optional usage event, then
    /// `Done`.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
