//! Provider registry: resolves a per-request provider/model selection to a
//! ready gateway.

use super::openai_compat::OpenAiCompatibleGateway;
use lens_application::{GatewayError, ModelGateway, ModelResolver};
use lens_domain::{ProviderConfig, ProviderKind, ProviderSelection};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds gateways from [`ProviderConfig`], sharing one HTTP client.
pub struct ProviderRegistry {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl ProviderRegistry {
    /// Create the registry.
    ///
    /// Fails when the default provider has no API key, so misconfiguration
    /// surfaces at startup rather than on the first request.
    pub fn new(config: ProviderConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        let registry = Self { config, client };
        registry.api_key(registry.config.default)?;
        Ok(registry)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// API key for a provider: inline config first, then its environment
    /// variable.
    pub fn api_key(&self, kind: ProviderKind) -> Result<String, GatewayError> {
        let api = self.config.api(kind);
        api.api_key
            .clone()
            .or_else(|| std::env::var(&api.api_key_env).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GatewayError::ModelNotAvailable(format!(
                    "provider {} is not configured (set {})",
                    kind, api.api_key_env
                ))
            })
    }

    /// Providers that currently have credentials.
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.api_key(*k).is_ok())
            .collect()
    }
}

impl ModelResolver for ProviderRegistry {
    fn resolve(&self, selection: &ProviderSelection) -> Result<Arc<dyn ModelGateway>, GatewayError> {
        let kind = selection.provider.unwrap_or(self.config.default);
        let model = selection
            .model
            .clone()
            .unwrap_or_else(|| self.config.model_for(kind));
        let api_key = self.api_key(kind)?;
        debug!("Resolved provider {} with model {}", kind, model);

        let gateway = OpenAiCompatibleGateway::new(
            kind,
            model,
            api_key,
            self.config.api(kind).base_url.clone(),
            self.client.clone(),
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);
        Ok(Arc::new(gateway))
    }

    fn default_provider(&self) -> ProviderKind {
        self.config.default
    }

    fn default_model(&self) -> String {
        self.config.model_for(self.config.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_ENV: &str = "REPO_LENS_TEST_UNSET_API_KEY";

    fn config() -> ProviderConfig {
        let mut config = ProviderConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        config.openrouter.api_key_env = UNSET_ENV.to_string();
        config.gemini.api_key = Some("g-test".to_string());
        config
    }

    #[test]
    fn resolves_default_and_override() {
        let registry = ProviderRegistry::new(config()).unwrap();
        assert_eq!(registry.default_provider(), ProviderKind::OpenAi);
        assert_eq!(registry.default_model(), "gpt-4o-mini");

        let gateway = registry.resolve(&ProviderSelection::default()).unwrap();
        assert_eq!(gateway.provider(), ProviderKind::OpenAi);
        assert_eq!(gateway.model(), "gpt-4o-mini");

        let selection = ProviderSelection::new(Some(ProviderKind::Gemini), Some("gemini-2.5-pro".into()));
        let gateway = registry.resolve(&selection).unwrap();
        assert_eq!(gateway.provider(), ProviderKind::Gemini);
        assert_eq!(gateway.model(), "gemini-2.5-pro");
    }

    #[test]
    fn unconfigured_override_is_unavailable() {
        let registry = ProviderRegistry::new(config()).unwrap();
        let selection = ProviderSelection::new(Some(ProviderKind::OpenRouter), None);
        let err = registry.resolve(&selection).err().unwrap();
        assert!(matches!(err, GatewayError::ModelNotAvailable(m) if m.contains(UNSET_ENV)));
        assert_eq!(
            registry.configured_providers(),
            vec![ProviderKind::OpenAi, ProviderKind::Gemini]
        );
    }

    #[test]
    fn missing_default_key_fails_at_startup() {
        let mut config = config();
        config.default = ProviderKind::OpenRouter;
        assert!(ProviderRegistry::new(config).is_err());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut config = config();
        config.openai.api_key = Some("   ".to_string());
        config.openai.api_key_env = UNSET_ENV.to_string();
        assert!(ProviderRegistry::new(config).is_err());
    }
}
