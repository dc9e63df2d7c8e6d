//! LLM provider implementations.
//!
//! Concrete [`LlmProvider`](agentdeck_core::llm::provider::LlmProvider)
//! adapters for OpenAI and Gemini, plus [`build_registry`] which registers
//! every provider that has an API key.

pub mod gemini;
pub mod openai;

use secrecy::SecretString;

use agentdeck_core::llm::box_provider::BoxLlmProvider;
use agentdeck_core::llm::registry::ProviderRegistry;
use agentdeck_types::config::ProviderSettings;
use agentdeck_types::llm::{LlmError, ProviderKind};

use self::gemini::GeminiProvider;
use self::openai::OpenAiProvider;

/// Environment variable holding the API key for `kind`.
pub fn api_key_env(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Gemini => "GEMINI_API_KEY",
    }
}

/// Read a provider's API key from the environment. Blank values count as
/// missing.
pub fn api_key_from_env(kind: ProviderKind) -> Option<SecretString> {
    std::env::var(api_key_env(kind))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// Build the provider registry. Providers without a key are skipped.
pub fn build_registry(
    settings: &ProviderSettings,
    openai_key: Option<SecretString>,
    gemini_key: Option<SecretString>,
) -> Result<ProviderRegistry, LlmError> {
    let mut registry = ProviderRegistry::new();

    match openai_key {
        Some(key) => {
            let provider = match settings.openai_base_url.as_deref() {
                Some(url) => OpenAiProvider::with_base_url(key, url),
                None => OpenAiProvider::new(key),
            };
            registry.register(BoxLlmProvider::new(provider));
        }
        None => tracing::warn!(
            env = api_key_env(ProviderKind::OpenAi),
            "no API key, openai provider disabled"
        ),
    }

    match gemini_key {
        Some(key) => {
            let provider = match settings.gemini_base_url.as_deref() {
                Some(url) => GeminiProvider::with_base_url(key, url)?,
                None => GeminiProvider::new(key)?,
            };
            registry.register(BoxLlmProvider::new(provider));
        }
        None => tracing::warn!(
            env = api_key_env(ProviderKind::Gemini),
            "no API key, gemini provider disabled"
        ),
    }

    tracing::info!(providers = ?registry.kinds(), "provider registry built");
    Ok(registry)
}
