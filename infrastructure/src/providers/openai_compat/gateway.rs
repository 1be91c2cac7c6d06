//! Streaming gateway for OpenAI-compatible chat completions endpoints.

use super::stream::pump;
use super::types::{SamplingOptions, build_request_body, error_message};
use async_trait::async_trait;
use lens_application::{GatewayError, GenerationRequest, ModelGateway, StreamHandle};
use lens_domain::ProviderKind;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Buffered stream events between the HTTP reader and the orchestrator.
const STREAM_BUFFER: usize = 64;

/// One provider + model pair, speaking `POST {base_url}/chat/completions`.
///
/// OpenAI, OpenRouter and Gemini (through its OpenAI compatibility layer)
/// share this wire format.
pub struct OpenAiCompatibleGateway {
    kind: ProviderKind,
    model: String,
    api_key: String,
    base_url: String,
    options: SamplingOptions,
    client: reqwest::Client,
}

impl OpenAiCompatibleGateway {
    pub fn new(
        kind: ProviderKind,
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            kind,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options: SamplingOptions {
                temperature: 0.7,
                max_tokens: None,
            },
            client,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Map a non-success HTTP status to a gateway error.
pub(crate) fn status_error(status: StatusCode, body: &str, model: &str) -> GatewayError {
    let message = format!("HTTP {}: {}", status.as_u16(), error_message(body));
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(message),
        StatusCode::NOT_FOUND => GatewayError::ModelNotAvailable(format!("{model} ({message})")),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
        s if s.is_server_error() => GatewayError::ConnectionError(message),
        _ => GatewayError::RequestFailed(message),
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() || e.is_request() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl ModelGateway for OpenAiCompatibleGateway {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<StreamHandle, GatewayError> {
        let body = build_request_body(&self.model, self.options, &request);
        debug!(
            "POST {} (model={}, messages={}, tools={})",
            self.endpoint(),
            self.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, &text, &self.model);
            info!("{} request failed: {}", self.kind, err);
            return Err(err);
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump(response.bytes_stream(), tx));
        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "", "m"),
            GatewayError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "oops", "m"),
            GatewayError::ConnectionError(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "", "gpt-x"),
            GatewayError::ModelNotAvailable(m) if m.starts_with("gpt-x")
        ));
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT, "", "m"),
            GatewayError::Timeout
        );
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"bad key"}}"#,
            "m",
        );
        assert_eq!(err, GatewayError::RequestFailed("HTTP 401: bad key".into()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let gateway = OpenAiCompatibleGateway::new(
            ProviderKind::OpenRouter,
            "openai/gpt-4o-mini",
            "key",
            "https://openrouter.ai/api/v1/",
            reqwest::Client::new(),
        )
        .with_temperature(0.1)
        .with_max_tokens(Some(256));
        assert_eq!(gateway.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(gateway.provider(), ProviderKind::OpenRouter);
        assert_eq!(gateway.model(), "openai/gpt-4o-mini");
        assert_eq!(gateway.options.max_tokens, Some(256));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let gateway = OpenAiCompatibleGateway::new(
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            "key",
            "http://127.0.0.1:9",
            reqwest::Client::new(),
        );
        let err = gateway
            .generate(GenerationRequest::new(vec![]))
            .await
            .err()
            .unwrap();
        assert!(err.is_retryable(), "{err:?}");
    }
}
