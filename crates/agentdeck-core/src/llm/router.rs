//! Generation Router: picks the provider adapter an agent is bound to and
//! delegates one call to it.
//!
//! Selection is pure and never retried. An unknown provider tag, a known tag
//! with no registered adapter, or a model the provider does not serve all
//! fail closed with [`RouteError::UnsupportedProvider`].

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tracing::{Instrument, info_span};

use agentdeck_types::agent::Agent;
use agentdeck_types::chat::ChatMessage;
use agentdeck_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, ProviderKind, StreamEvent,
};

use super::box_provider::BoxLlmProvider;
use super::registry::ProviderRegistry;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub struct GenerationRouter {
    registry: ProviderRegistry,
    default_provider: ProviderKind,
}

impl GenerationRouter {
    pub fn new(registry: ProviderRegistry, default_provider: ProviderKind) -> Self {
        Self {
            registry,
            default_provider,
        }
    }

    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    pub fn registered(&self) -> Vec<ProviderKind> {
        self.registry.kinds()
    }

    /// Resolve the adapter for an agent's provider tag and model.
    pub fn resolve(&self, agent: &Agent) -> Result<&BoxLlmProvider, RouteError> {
        let tag = agent.provider.trim();
        let kind = if tag.is_empty() {
            self.default_provider
        } else {
            tag.parse::<ProviderKind>()
                .map_err(|_| RouteError::UnsupportedProvider(tag.to_string()))?
        };

        let provider = self.registry.get(kind).ok_or_else(|| {
            RouteError::UnsupportedProvider(format!("{kind} (not configured)"))
        })?;

        if !kind.supports_model(&agent.model) {
            return Err(RouteError::UnsupportedProvider(format!(
                "{kind} does not serve model '{}'",
                agent.model
            )));
        }

        Ok(provider)
    }

    /// Send one completion for `agent` with prior `history` and the new
    /// user message.
    pub async fn dispatch(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        user_message: &str,
    ) -> Result<CompletionResponse, RouteError> {
        let provider = self.resolve(agent)?;
        let request = build_request(agent, history, user_message);

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );

        let response = provider.complete(&request).instrument(span.clone()).await?;
        span.record("gen_ai.usage.input_tokens", response.usage.prompt_tokens);
        span.record("gen_ai.usage.output_tokens", response.usage.completion_tokens);
        Ok(response)
    }

    /// Streaming variant of [`dispatch`](Self::dispatch) with the same
    /// selection rules. Selection errors surface immediately; provider
    /// errors arrive through the stream.
    pub fn dispatch_stream(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        user_message: &str,
    ) -> Result<EventStream, RouteError> {
        let provider = self.resolve(agent)?;
        let request = build_request(agent, history, user_message);

        let span = info_span!(
            "gen_ai.chat_stream",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
        );

        let inner = provider.stream(request);
        Ok(Box::pin(StreamInSpan { inner, span }))
    }
}

/// Assemble the provider request: system prompt, history oldest first,
/// then the new user message.
pub fn build_request(agent: &Agent, history: &[ChatMessage], user_message: &str) -> CompletionRequest {
    let mut messages: Vec<Message> = history
        .iter()
        .map(|m| Message {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();
    messages.push(Message::user(user_message));

    let system = if agent.system_prompt.trim().is_empty() {
        None
    } else {
        Some(agent.system_prompt.clone())
    };

    CompletionRequest {
        model: agent.model.clone(),
        system,
        messages,
        max_tokens: agent.max_tokens,
        temperature: Some(agent.temperature),
    }
}

/// Keeps a span entered while the wrapped stream is polled.
struct StreamInSpan {
    inner: EventStream,
    span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
