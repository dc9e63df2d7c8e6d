//! Provider registry for runtime provider lookup.

use std::collections::HashMap;

use agentdeck_types::llm::ProviderKind;

use super::box_provider::BoxLlmProvider;

/// Registry of available LLM providers, keyed by provider tag.
///
/// Built once at startup; only providers with credentials are registered.
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, BoxLlmProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its own kind.
    ///
    /// If a provider of this kind already exists, it is replaced.
    pub fn register(&mut self, provider: BoxLlmProvider) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&BoxLlmProvider> {
        self.providers.get(&kind)
    }

    /// Registered kinds, in a stable order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
