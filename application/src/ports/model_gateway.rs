//! Model Gateway port
//!
//! Defines the interface for communicating with language-model providers.
//! A gateway is stateless: every [`generate`](ModelGateway::generate) call
//! carries the whole conversation and the tools the model may request.

use async_trait::async_trait;
use lens_domain::{
    LlmResponse, Message, ProviderKind, ProviderSelection, StreamEvent, ToolDefinition,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during model gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::ConnectionError(_) | GatewayError::RateLimited(_) | GatewayError::Timeout
        )
    }
}

/// One generation request: the conversation so far and the callable tools.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Handle for receiving streaming events from a generation request.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Wrap an already complete response (for non-streaming backends).
    pub fn from_response(response: LlmResponse) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: try_send cannot fail
        let _ = tx.try_send(StreamEvent::CompletedResponse(response));
        Self::new(rx)
    }

    /// Consume the stream and return the final response.
    pub async fn collect_response(mut self) -> Result<LlmResponse, GatewayError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::ToolCallDelta { .. } => {}
                StreamEvent::CompletedResponse(response) => return Ok(response),
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
            }
        }
        // Channel closed without a terminal event; return what we have
        Ok(LlmResponse::from_text(full_text))
    }
}

/// Gateway for model communication
///
/// This port defines how the application layer talks to model providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Open a streaming generation. Errors returned here happen before any
    /// output; errors after the stream opened arrive as [`StreamEvent::Error`].
    async fn generate(&self, request: GenerationRequest) -> Result<StreamHandle, GatewayError>;
}

/// Chooses a gateway for a request, honoring per-request overrides.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, selection: &ProviderSelection) -> Result<Arc<dyn ModelGateway>, GatewayError>;

    fn default_provider(&self) -> ProviderKind;

    fn default_model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(GatewayError::Timeout.is_retryable());
        assert!(GatewayError::ConnectionError("reset".into()).is_retryable());
        assert!(GatewayError::RateLimited("429".into()).is_retryable());
        assert!(!GatewayError::ModelNotAvailable("x".into()).is_retryable());
        assert!(!GatewayError::RequestFailed("400".into()).is_retryable());
    }

    #[tokio::test]
    async fn collect_response_returns_completed() {
        let handle = StreamHandle::from_response(LlmResponse::from_text("done"));
        let response = handle.collect_response().await.unwrap();
        assert_eq!(response.text_content(), "done");
    }

    #[tokio::test]
    async fn collect_response_falls_back_to_deltas() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::Delta("a".into())).await.unwrap();
        tx.send(StreamEvent::Delta("b".into())).await.unwrap();
        drop(tx);
        let response = StreamHandle::new(rx).collect_response().await.unwrap();
        assert_eq!(response.text_content(), "ab");
    }

    #[tokio::test]
    async fn collect_response_surfaces_errors() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(StreamEvent::Error("boom".into())).await.unwrap();
        let err = StreamHandle::new(rx).collect_response().await.unwrap_err();
        assert_eq!(err, GatewayError::RequestFailed("boom".into()));
    }
}
