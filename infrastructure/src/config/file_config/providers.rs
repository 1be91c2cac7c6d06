//! Provider configuration from TOML (`[providers]` section)
//!
//! ```toml
//! [providers]
//! default = "openrouter"
//! model = "anthropic/claude-3.5-sonnet"
//!
//! [providers.openrouter]
//! api_key_env = "OPENROUTER_API_KEY"
//! ```

use lens_domain::{ApiProviderConfig, ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};

/// Settings for one OpenAI-compatible endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApiProviderConfig {
    /// Environment variable name for the API key (default per provider).
    pub api_key_env: Option<String>,
    /// Direct API key (not recommended; use the env var instead).
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Default model for this provider.
    pub model: Option<String>,
}

impl FileApiProviderConfig {
    fn to_api_config(&self, kind: ProviderKind) -> ApiProviderConfig {
        let defaults = ApiProviderConfig::for_kind(kind);
        ApiProviderConfig {
            api_key_env: self.api_key_env.clone().unwrap_or(defaults.api_key_env),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: self
                .base_url
                .clone()
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: self.model.clone().filter(|m| !m.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    /// Default provider: "openai", "openrouter" or "gemini".
    pub default: String,
    /// Model for the default provider (overrides its per-provider model).
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Whole-request timeout for one streamed completion.
    pub request_timeout_secs: u64,
    pub openai: FileApiProviderConfig,
    pub openrouter: FileApiProviderConfig,
    pub gemini: FileApiProviderConfig,
}

impl Default for FileProvidersConfig {
    fn default() -> Self {
        Self {
            default: "openai".to_string(),
            model: None,
            temperature: 0.7,
            max_tokens: None,
            request_timeout_secs: 300,
            openai: FileApiProviderConfig::default(),
            openrouter: FileApiProviderConfig::default(),
            gemini: FileApiProviderConfig::default(),
        }
    }
}

impl FileProvidersConfig {
    /// Convert to the domain type. An unknown default provider falls back to
    /// OpenAI; `validate()` reports it.
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            default: self.default.parse().unwrap_or(ProviderKind::OpenAi),
            model: self.model.clone().filter(|m| !m.trim().is_empty()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            request_timeout_secs: self.request_timeout_secs,
            openai: self.openai.to_api_config(ProviderKind::OpenAi),
            openrouter: self.openrouter.to_api_config(ProviderKind::OpenRouter),
            gemini: self.gemini.to_api_config(ProviderKind::Gemini),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_provider_defaults() {
        let config = FileProvidersConfig::default().to_provider_config();
        assert_eq!(config.default, ProviderKind::OpenAi);
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.openrouter.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn overrides_are_applied() {
        let file: FileProvidersConfig = toml::from_str(
            r#"
default = "gemini"
model = "gemini-2.5-pro"

[openai]
base_url = "http://localhost:8080/v1/"
api_key = ""
"#,
        )
        .unwrap();
        let config = file.to_provider_config();
        assert_eq!(config.default, ProviderKind::Gemini);
        assert_eq!(config.model_for(ProviderKind::Gemini), "gemini-2.5-pro");
        assert_eq!(config.openai.base_url, "http://localhost:8080/v1");
        assert_eq!(config.openai.api_key, None);
    }
}
