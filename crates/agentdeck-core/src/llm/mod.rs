//! LLM provider abstractions for agentdeck.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ProviderRegistry`: providers keyed by tag
//! - `GenerationRouter`: agent → provider selection and delegation

pub mod box_provider;
pub mod provider;
pub mod registry;
pub mod router;
