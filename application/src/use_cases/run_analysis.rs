//! Run Analysis use case.
//!
//! Drives one [`AnalysisMachine`] to completion against a model gateway and
//! a tool executor, forwarding every event the machine produces to the
//! session's [`EventSink`].
//!
//! The driver is the only place that performs I/O for a session:
//!
//! 1. Resolve the gateway for the requested provider/model
//! 2. Feed `Begin` to the machine and emit `start`
//! 3. Loop on the machine's [`Effect`]: stream a model turn, invoke a tool,
//!    or stop
//! 4. On cancellation, stop at the next suspension point without emitting
//!    anything further
//!
//! Retryable model errors (connection, rate limit, timeout) are retried with
//! linear backoff only while no token of the current turn has been emitted,
//! so a client never sees a turn's text twice.

use crate::config::AnalysisParams;
use crate::ports::model_gateway::{GatewayError, GenerationRequest, ModelGateway, ModelResolver};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use crate::use_cases::event_stream::{EventSink, EventStream, event_channel};
use chrono::Utc;
use lens_domain::{
    AnalysisMachine, AnalysisReport, AnalysisSession, DomainError, Effect, EventPayload, Locale,
    MachineInput, ProviderKind, ProviderSelection, RepoRef, SessionStatus, Step, StreamEvent,
    ToolCall, ToolError, ToolResult,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that prevent a session from starting.
///
/// Once a session has started, every failure is reported in-band as a
/// terminal `error` event instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] GatewayError),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis aborted: {0}")]
    Aborted(String),
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

/// Input for the [`RunAnalysisUseCase`].
#[derive(Debug, Clone)]
pub struct RunAnalysisInput {
    pub repo: RepoRef,
    pub locale: Locale,
    pub selection: ProviderSelection,
}

impl RunAnalysisInput {
    pub fn new(repo: RepoRef) -> Self {
        Self {
            repo,
            locale: Locale::default(),
            selection: ProviderSelection::default(),
        }
    }

    /// Validate raw request fields (HTTP body, CLI arguments).
    pub fn parse(
        repo_url: &str,
        language: Option<&str>,
        provider: Option<&str>,
        model: Option<String>,
    ) -> Result<Self, AnalysisError> {
        let repo = RepoRef::parse(repo_url)?;
        let locale = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(tag) => Locale::parse(tag)?,
            None => Locale::default(),
        };
        let provider = match provider.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => Some(name.parse::<ProviderKind>()?),
            None => None,
        };
        Ok(Self {
            repo,
            locale,
            selection: ProviderSelection::new(provider, model),
        })
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_selection(mut self, selection: ProviderSelection) -> Self {
        self.selection = selection;
        self
    }
}

/// Final state of a session once the driver has stopped.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub session: AnalysisSession,
    pub report: Option<AnalysisReport>,
    pub failure: Option<String>,
}

impl AnalysisOutcome {
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }
}

/// Use case for analyzing one repository.
#[derive(Clone)]
pub struct RunAnalysisUseCase {
    resolver: Arc<dyn ModelResolver>,
    tools: Arc<dyn ToolExecutorPort>,
    transcript: Arc<dyn TranscriptLogger>,
    params: AnalysisParams,
}

impl RunAnalysisUseCase {
    pub fn new(resolver: Arc<dyn ModelResolver>, tools: Arc<dyn ToolExecutorPort>) -> Self {
        Self {
            resolver,
            tools,
            transcript: Arc::new(NoTranscriptLogger),
            params: AnalysisParams::default(),
        }
    }

    pub fn with_transcript_logger(mut self, logger: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = logger;
        self
    }

    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn resolver(&self) -> &Arc<dyn ModelResolver> {
        &self.resolver
    }

    /// Start a session in the background and return its event stream.
    ///
    /// The session is cancelled when `parent` is cancelled or when the
    /// returned stream is dropped.
    pub fn start(
        &self,
        input: RunAnalysisInput,
        parent: &CancellationToken,
    ) -> Result<EventStream, AnalysisError> {
        let gateway = self.resolver.resolve(&input.selection)?;
        let token = parent.child_token();
        let session = AnalysisSession::new(input.repo.clone(), input.locale.clone());
        let (sink, stream) = event_channel(session.id(), self.params.event_buffer, token.clone());

        let driver = SessionDriver::new(self.clone(), input, session, gateway, sink, token);
        tokio::spawn(driver.run());
        Ok(stream)
    }

    /// Run a session to completion on the current task.
    pub async fn execute(
        &self,
        input: RunAnalysisInput,
        sink: EventSink,
        token: CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let gateway = self.resolver.resolve(&input.selection)?;
        let session = AnalysisSession::new(input.repo.clone(), input.locale.clone());
        let driver = SessionDriver::new(self.clone(), input, session, gateway, sink, token);
        Ok(driver.run().await)
    }
}

/// Owns everything one running session needs.
struct SessionDriver {
    use_case: RunAnalysisUseCase,
    gateway: Arc<dyn ModelGateway>,
    machine: AnalysisMachine,
    session: AnalysisSession,
    sink: EventSink,
    token: CancellationToken,
}

impl SessionDriver {
    fn new(
        use_case: RunAnalysisUseCase,
        input: RunAnalysisInput,
        session: AnalysisSession,
        gateway: Arc<dyn ModelGateway>,
        sink: EventSink,
        token: CancellationToken,
    ) -> Self {
        let machine = AnalysisMachine::new(
            input.repo,
            input.locale,
            use_case.tools.tool_spec().clone(),
            use_case.params.limits(),
        );
        Self {
            use_case,
            gateway,
            machine,
            session,
            sink,
            token,
        }
    }

    async fn run(mut self) -> AnalysisOutcome {
        info!(
            session_id = %self.session.id(),
            repo = %self.session.repo(),
            locale = %self.session.locale(),
            provider = %self.gateway.provider(),
            model = %self.gateway.model(),
            "Starting analysis"
        );
        self.log(
            "session_start",
            json!({
                "repo_url": self.session.repo().as_str(),
                "locale": self.session.locale().as_str(),
                "provider": self.gateway.provider().as_str(),
                "model": self.gateway.model(),
            }),
        );

        let aborted = match self.drive().await {
            Ok(()) => None,
            Err(AnalysisError::Cancelled) => {
                self.machine.step(MachineInput::Cancel);
                self.session.cancel();
                None
            }
            Err(e) => {
                self.machine.step(MachineInput::Cancel);
                self.session.cancel();
                Some(e.to_string())
            }
        };

        let failure = aborted.or_else(|| self.machine.failure().map(|f| f.to_string()));
        match self.session.status() {
            SessionStatus::Completed => info!(
                session_id = %self.session.id(),
                tool_calls = self.machine.tool_calls_made(),
                "Analysis completed"
            ),
            SessionStatus::Cancelled => info!(session_id = %self.session.id(), "Analysis cancelled"),
            status => warn!(
                session_id = %self.session.id(),
                status = %status,
                failure = failure.as_deref().unwrap_or("unknown"),
                "Analysis did not complete"
            ),
        }
        self.log(
            "session_end",
            json!({
                "status": self.session.status().as_str(),
                "failure": failure,
                "tool_calls": self.machine.tool_calls_made(),
                "events": self.session.events().len(),
            }),
        );

        AnalysisOutcome {
            report: self.machine.report().cloned(),
            failure,
            session: self.session,
        }
    }

    async fn drive(&mut self) -> Result<(), AnalysisError> {
        let mut step = self.machine.step(MachineInput::Begin);
        loop {
            self.emit(std::mem::take(&mut step.events)).await?;
            step = match step.effect {
                Effect::Generate => self.generate().await?,
                Effect::InvokeTool(call) => self.invoke(call).await?,
                Effect::Finish | Effect::None => return Ok(()),
            };
        }
    }

    /// Record and deliver events in order.
    async fn emit(&mut self, events: Vec<EventPayload>) -> Result<(), AnalysisError> {
        for payload in events {
            // A rejected event ends the stream; later events would follow a gap.
            let event = self.session.record(payload, Utc::now()).map_err(|e| {
                error!(session_id = %self.session.id(), error = %e, "Event rejected, ending session");
                AnalysisError::Aborted(e.to_string())
            })?;
            self.sink
                .send(event)
                .await
                .map_err(|_| AnalysisError::Cancelled)?;
        }
        Ok(())
    }

    /// Run one model turn, retrying retryable failures before its first token.
    async fn generate(&mut self) -> Result<Step, AnalysisError> {
        let max_retries = self.use_case.params.max_model_retries;
        let mut attempt = 0usize;

        'attempts: loop {
            attempt += 1;
            let request = GenerationRequest::new(self.machine.conversation().messages().to_vec())
                .with_tools(self.machine.tools().all().cloned().collect());
            debug!(
                session_id = %self.session.id(),
                attempt,
                messages = request.messages.len(),
                "Requesting model turn"
            );

            let opened = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(AnalysisError::Cancelled),
                opened = self.gateway.generate(request) => opened,
            };
            let mut handle = match opened {
                Ok(handle) => handle,
                Err(e) if e.is_retryable() && attempt <= max_retries => {
                    warn!(session_id = %self.session.id(), attempt, error = %e, "Model request failed, retrying");
                    self.backoff(attempt).await?;
                    continue 'attempts;
                }
                Err(e) => return Ok(self.machine.step(MachineInput::ModelFailed(e.to_string()))),
            };

            loop {
                let event = tokio::select! {
                    biased;
                    _ = self.token.cancelled() => return Err(AnalysisError::Cancelled),
                    event = handle.receiver.recv() => event,
                };

                let failure = match event {
                    Some(StreamEvent::Delta(text)) => {
                        let step = self.machine.step(MachineInput::TextDelta(text));
                        if step.effect != Effect::None {
                            return Ok(step);
                        }
                        self.emit(step.events).await?;
                        continue;
                    }
                    Some(StreamEvent::ToolCallDelta { .. }) => continue,
                    Some(StreamEvent::CompletedResponse(response)) => {
                        self.log(
                            "model_turn",
                            json!({
                                "attempt": attempt,
                                "text": response.text_content(),
                                "tool_calls": response
                                    .tool_calls()
                                    .iter()
                                    .map(|c| json!({"id": c.call_id, "name": c.tool_name}))
                                    .collect::<Vec<_>>(),
                            }),
                        );
                        return Ok(self.machine.step(MachineInput::TurnCompleted(response)));
                    }
                    Some(StreamEvent::Error(e)) => e,
                    None => "model stream ended unexpectedly".to_string(),
                };

                if !self.machine.turn_started() && attempt <= max_retries {
                    warn!(session_id = %self.session.id(), attempt, error = %failure, "Model stream failed, retrying");
                    self.backoff(attempt).await?;
                    continue 'attempts;
                }
                return Ok(self.machine.step(MachineInput::ModelFailed(failure)));
            }
        }
    }

    async fn backoff(&self, attempt: usize) -> Result<(), AnalysisError> {
        let delay = self.use_case.params.retry_backoff * attempt as u32;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(AnalysisError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Invoke one tool; every problem becomes a failed result for the model.
    async fn invoke(&mut self, call: ToolCall) -> Result<Step, AnalysisError> {
        let tools = self.use_case.tools.clone();
        let started = Instant::now();
        debug!(
            session_id = %self.session.id(),
            call_id = %call.call_id,
            tool = %call.tool_name,
            "Invoking tool"
        );

        let mut result = if !tools.has_tool(&call.tool_name) {
            ToolResult::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::unknown_tool(&call.tool_name),
            )
        } else {
            let timeout = self.use_case.params.tool_timeout;
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(AnalysisError::Cancelled),
                result = tokio::time::timeout(timeout, tools.execute(&call)) => match result {
                    Ok(result) => result,
                    Err(_) => ToolResult::failure(
                        &call.call_id,
                        &call.tool_name,
                        ToolError::timeout(format!("{} after {}s", call.tool_name, timeout.as_secs())),
                    ),
                },
            }
        };

        if result.call_id.is_empty() {
            result.call_id = call.call_id.clone();
        }
        if result.duration_ms.is_none() {
            result = result.with_duration(started.elapsed().as_millis() as u64);
        }
        if let Some(err) = result.error() {
            warn!(
                session_id = %self.session.id(),
                tool = %call.tool_name,
                error = %err,
                "Tool call failed"
            );
        }
        self.log(
            "tool_result",
            json!({
                "call_id": result.call_id,
                "tool": result.tool_name,
                "arguments": call.arguments_json(),
                "success": result.is_success(),
                "output_chars": result.output().map(str::len).unwrap_or(0),
                "error": result.error().map(|e| e.to_string()),
                "duration_ms": result.duration_ms,
            }),
        );

        Ok(self.machine.step(MachineInput::ToolFinished(result)))
    }

    fn log(&self, event_type: &'static str, payload: serde_json::Value) {
        self.use_case
            .transcript
            .log(TranscriptEvent::new(self.session.id(), event_type, payload));
    }
}
