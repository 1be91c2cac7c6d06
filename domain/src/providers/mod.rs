//! Provider configuration types (provider-neutral, serde-free).
//!
//! These types define the shape of model provider settings without
//! depending on any serialization format (TOML, JSON, etc.).

use crate::core::error::DomainError;
use std::fmt;
use std::str::FromStr;

/// Supported model providers. All speak the OpenAI chat completions
/// protocol, at different base URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::OpenRouter => "openai/gpt-4o-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-request provider override. `None` fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
}

impl ProviderSelection {
    pub fn new(provider: Option<ProviderKind>, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.filter(|m| !m.trim().is_empty()),
        }
    }
}

/// Top-level provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider used when a request does not pick one.
    pub default: ProviderKind,
    /// Model override for the default provider.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: u64,
    pub openai: ApiProviderConfig,
    pub openrouter: ApiProviderConfig,
    pub gemini: ApiProviderConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: ProviderKind::OpenAi,
            model: None,
            temperature: 0.7,
            max_tokens: None,
            request_timeout_secs: 300,
            openai: ApiProviderConfig::for_kind(ProviderKind::OpenAi),
            openrouter: ApiProviderConfig::for_kind(ProviderKind::OpenRouter),
            gemini: ApiProviderConfig::for_kind(ProviderKind::Gemini),
        }
    }
}

impl ProviderConfig {
    pub fn api(&self, kind: ProviderKind) -> &ApiProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    /// Model to use for `kind` when the request does not name one.
    ///
    /// The top-level `model` only applies to the default provider.
    pub fn model_for(&self, kind: ProviderKind) -> String {
        if kind == self.default
            && let Some(model) = &self.model
        {
            return model.clone();
        }
        self.api(kind)
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }
}

/// Settings for one OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiProviderConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub base_url: String,
    /// Provider-specific default model.
    pub model: Option<String>,
}

impl ApiProviderConfig {
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            api_key_env: kind.default_api_key_env().to_string(),
            api_key: None,
            base_url: kind.default_base_url().to_string(),
            model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("OpenRouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("acme".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn model_resolution_order() {
        let mut config = ProviderConfig::default();
        assert_eq!(config.model_for(ProviderKind::OpenAi), "gpt-4o-mini");

        config.model = Some("gpt-4.1".to_string());
        config.gemini.model = Some("gemini-2.5-pro".to_string());
        assert_eq!(config.model_for(ProviderKind::OpenAi), "gpt-4.1");
        assert_eq!(config.model_for(ProviderKind::Gemini), "gemini-2.5-pro");
        assert_eq!(config.model_for(ProviderKind::OpenRouter), "openai/gpt-4o-mini");
    }

    #[test]
    fn selection_drops_blank_model() {
        let sel = ProviderSelection::new(Some(ProviderKind::Gemini), Some("  ".to_string()));
        assert_eq!(sel.model, None);
    }
}
