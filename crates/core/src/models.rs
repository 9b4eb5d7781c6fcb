//! # Examforge Models
//!
//! LLM provider configuration shared by the generator adapter and the
//! pipeline config. Every provider listed here exposes an OpenAI-compatible
//! chat-completions endpoint.

use serde::{Deserialize, Serialize};

/// Supported LLM providers
///
/// - OpenAI (GPT) - `OPENAI_API_KEY`
/// - OpenRouter (Gateway) - `OPENROUTER_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
/// - Grok (xAI) - `XAI_API_KEY`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    OpenRouter,
    DeepSeek,
    Grok,
}

impl LlmProvider {
    /// Get all available providers
    pub fn all() -> Vec<LlmProvider> {
        vec![
            LlmProvider::OpenAI,
            LlmProvider::OpenRouter,
            LlmProvider::DeepSeek,
            LlmProvider::Grok,
        ]
    }

    /// Identifier used in config files
    pub fn id(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::DeepSeek => "deepseek",
            LlmProvider::Grok => "grok",
        }
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::DeepSeek => "DeepSeek",
            LlmProvider::Grok => "Grok",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o",
            LlmProvider::OpenRouter => "openai/gpt-4o",
            LlmProvider::DeepSeek => "deepseek-chat",
            LlmProvider::Grok => "grok-2-latest",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LlmProvider::DeepSeek => "https://api.deepseek.com/v1",
            LlmProvider::Grok => "https://api.x.ai/v1",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::DeepSeek => "DEEPSEEK_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
        }
    }

    /// Whether the provider honours `response_format: json_schema`
    pub fn supports_json_schema(&self) -> bool {
        !matches!(self, LlmProvider::DeepSeek)
    }
}

/// Configuration for LLM model selection
///
/// ## Example
/// ```rust,ignore
/// use examforge_core::models::{ModelConfig, LlmProvider};
///
/// let config = ModelConfig::with_provider(LlmProvider::DeepSeek, "deepseek-chat");
/// assert_eq!(config.base_url(), "https://api.deepseek.com/v1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    /// LLM provider to use
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g., "gpt-4o", "deepseek-chat")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,
    /// Optional override of the API key environment variable
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::with_provider(LlmProvider::OpenAI, LlmProvider::OpenAI.default_model())
    }
}

impl ModelConfig {
    /// Create a new model config with the default provider (OpenAI)
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_provider(LlmProvider::OpenAI, model)
    }

    /// Create config for a specific provider
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
            api_key_env: None,
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Effective base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.api_key_env())
    }

    /// Read the API key from the environment
    pub fn api_key(&self) -> anyhow::Result<String> {
        let var = self.api_key_env();
        std::env::var(var).map_err(|_| anyhow::anyhow!("{} is not set", var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_provider_display_names() {
        assert_eq!(LlmProvider::OpenAI.display_name(), "OpenAI");
        assert_eq!(LlmProvider::DeepSeek.display_name(), "DeepSeek");
    }

    #[test]
    fn test_ids_match_serde_names() {
        for provider in LlmProvider::all() {
            let json = serde_json::to_value(provider).unwrap();
            assert_eq!(json, provider.id());
        }
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let config = ModelConfig::new("gpt-4o-mini").with_base_url("http://localhost:8000/v1/");
        assert_eq!(config.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::with_provider(LlmProvider::OpenRouter, "openai/gpt-4o");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("openrouter"));
        assert!(json.contains("openai/gpt-4o"));

        let parsed: ModelConfig = serde_json::from_str(r#"{"model":"gpt-4o"}"#).unwrap();
        assert_eq!(parsed.provider, LlmProvider::OpenAI);
    }
}
