//! Global configuration types for agentdeck.
//!
//! `GlobalConfig` represents the top-level `config.toml` in the data
//! directory. Every section and field has a default, so an empty or missing
//! file yields a working configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub chat: ChatSettings,

    #[serde(default)]
    pub live_metrics: LiveMetricsSettings,

    #[serde(default)]
    pub providers: ProviderSettings,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat turn tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Most recent stored messages replayed to the provider.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Maximum characters of the first message kept as conversation title.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_history_limit() -> u32 {
    20
}

fn default_title_max_chars() -> usize {
    50
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// Live metrics push cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMetricsSettings {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
    #[serde(default = "default_max_records")]
    pub max_records: u32,
}

fn default_tick_interval_secs() -> u64 {
    5
}

fn default_lookback_secs() -> u64 {
    60
}

fn default_max_records() -> u32 {
    10
}

impl Default for LiveMetricsSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            lookback_secs: default_lookback_secs(),
            max_records: default_max_records(),
        }
    }
}

/// Provider selection and endpoint overrides. API keys come from the
/// environment, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider used when an agent's provider tag is empty.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_base_url: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            openai_base_url: None,
            gemini_base_url: None,
        }
    }
}
