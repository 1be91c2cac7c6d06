//! The analysis state machine.
//!
//! [`AnalysisMachine`] is a pure transition function over
//! `(phase, input) -> (phase, events, effect)`. It performs no I/O: the
//! application layer feeds it model and tool outcomes, forwards the events
//! it returns, and carries out the requested [`Effect`].
//!
//! ```text
//! Initializing ──Begin──▶ Reasoning ◀──────────────┐
//!                            │  │                  │
//!            tool requested  │  │ turn done,       │ result appended
//!                            ▼  │ no tools         │
//!                        Invoking ─────────────────┘
//!                               ▼
//!                          Finalizing ──▶ Completed | Failed
//!
//! Cancel from any non-terminal phase ──▶ Cancelled
//! ```

use super::failure::FailureReason;
use crate::core::locale::Locale;
use crate::core::repo::RepoRef;
use crate::event::EventPayload;
use crate::prompt::AnalysisPromptTemplate;
use crate::report::{AnalysisReport, parse_report};
use crate::session::conversation::{Conversation, Message};
use crate::session::response::LlmResponse;
use crate::tool::entities::{ToolCall, ToolSpec};
use crate::tool::value_objects::ToolResult;
use std::collections::{HashSet, VecDeque};

/// Bounds on a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// Maximum number of tool invocations.
    pub max_tool_calls: usize,
    /// Maximum conversation size in characters.
    pub max_conversation_chars: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_tool_calls: 25,
            max_conversation_chars: 400_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Initializing,
    Reasoning,
    Invoking,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
}

impl AnalysisPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisPhase::Completed | AnalysisPhase::Failed | AnalysisPhase::Cancelled
        )
    }
}

/// Inputs the driver feeds into the machine.
#[derive(Debug, Clone)]
pub enum MachineInput {
    Begin,
    /// A text increment of the current model turn.
    TextDelta(String),
    /// The current model turn finished.
    TurnCompleted(LlmResponse),
    /// The in-flight tool call finished (successfully or not).
    ToolFinished(ToolResult),
    /// The model could not produce a turn and retries are exhausted.
    ModelFailed(String),
    Cancel,
}

impl MachineInput {
    fn name(&self) -> &'static str {
        match self {
            MachineInput::Begin => "begin",
            MachineInput::TextDelta(_) => "text delta",
            MachineInput::TurnCompleted(_) => "turn completed",
            MachineInput::ToolFinished(_) => "tool finished",
            MachineInput::ModelFailed(_) => "model failed",
            MachineInput::Cancel => "cancel",
        }
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing; keep feeding the current operation's output.
    None,
    /// Open a generation request with [`AnalysisMachine::conversation`].
    Generate,
    /// Execute this tool call.
    InvokeTool(ToolCall),
    /// The session is over.
    Finish,
}

/// Output of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub events: Vec<EventPayload>,
    pub effect: Effect,
}

impl Step {
    fn idle() -> Self {
        Self {
            events: Vec::new(),
            effect: Effect::None,
        }
    }
}

/// Drives one analysis session.
#[derive(Debug)]
pub struct AnalysisMachine {
    repo: RepoRef,
    locale: Locale,
    tools: ToolSpec,
    limits: AnalysisLimits,
    phase: AnalysisPhase,
    conversation: Conversation,
    pending: VecDeque<ToolCall>,
    in_flight: Option<ToolCall>,
    used_call_ids: HashSet<String>,
    tool_calls_made: usize,
    turn_text: String,
    generated: String,
    correction_used: bool,
    failure: Option<FailureReason>,
    report: Option<AnalysisReport>,
}

impl AnalysisMachine {
    pub fn new(repo: RepoRef, locale: Locale, tools: ToolSpec, limits: AnalysisLimits) -> Self {
        Self {
            repo,
            locale,
            tools,
            limits,
            phase: AnalysisPhase::Initializing,
            conversation: Conversation::new(),
            pending: VecDeque::new(),
            in_flight: None,
            used_call_ids: HashSet::new(),
            tool_calls_made: 0,
            turn_text: String::new(),
            generated: String::new(),
            correction_used: false,
            failure: None,
            report: None,
        }
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn tools(&self) -> &ToolSpec {
        &self.tools
    }

    pub fn tool_calls_made(&self) -> usize {
        self.tool_calls_made
    }

    /// All text the model generated during the session, in order.
    pub fn generated_text(&self) -> &str {
        &self.generated
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// Whether a text delta has already been emitted in the current turn.
    pub fn turn_started(&self) -> bool {
        !self.turn_text.is_empty()
    }

    /// Apply one input. Inputs after a terminal phase are discarded.
    pub fn step(&mut self, input: MachineInput) -> Step {
        if self.phase.is_terminal() {
            return Step::idle();
        }

        match (self.phase, input) {
            (_, MachineInput::Cancel) => {
                self.phase = AnalysisPhase::Cancelled;
                self.pending.clear();
                self.in_flight = None;
                Step::idle()
            }
            (AnalysisPhase::Initializing, MachineInput::Begin) => self.begin(),
            (AnalysisPhase::Reasoning, MachineInput::TextDelta(delta)) => {
                if delta.is_empty() {
                    return Step::idle();
                }
                self.turn_text.push_str(&delta);
                self.generated.push_str(&delta);
                Step {
                    events: vec![EventPayload::token(delta)],
                    effect: Effect::None,
                }
            }
            (AnalysisPhase::Reasoning, MachineInput::TurnCompleted(response)) => {
                self.complete_turn(response)
            }
            (AnalysisPhase::Invoking, MachineInput::ToolFinished(result)) => {
                self.finish_tool(result)
            }
            (_, MachineInput::ModelFailed(reason)) => {
                self.fail(FailureReason::Model(reason), Vec::new())
            }
            (_, MachineInput::ToolFinished(result)) => self.fail(
                FailureReason::ToolContract(format!(
                    "result for {} ({}) while no tool call is in flight",
                    result.tool_name, result.call_id
                )),
                Vec::new(),
            ),
            (phase, other) => self.fail(
                FailureReason::Model(format!(
                    "unexpected {} while {:?}",
                    other.name(),
                    phase
                )),
                Vec::new(),
            ),
        }
    }

    fn begin(&mut self) -> Step {
        self.conversation.push(Message::system(AnalysisPromptTemplate::system(
            &self.repo,
            &self.locale,
            &self.tools,
        )));
        self.conversation
            .push(Message::user(AnalysisPromptTemplate::analysis_request(
                &self.repo,
                &self.locale,
            )));
        self.phase = AnalysisPhase::Reasoning;
        Step {
            events: vec![EventPayload::Start {
                repo_url: self.repo.as_str().to_string(),
            }],
            effect: Effect::Generate,
        }
    }

    fn complete_turn(&mut self, response: LlmResponse) -> Step {
        let mut events = Vec::new();

        // Providers that do not stream deltas deliver the whole text here.
        let text = if self.turn_text.is_empty() {
            let text = response.text_content();
            if !text.is_empty() {
                self.generated.push_str(&text);
                events.push(EventPayload::token(text.clone()));
            }
            text
        } else {
            std::mem::take(&mut self.turn_text)
        };

        let calls = self.assign_call_ids(response.tool_calls());
        if calls.is_empty() {
            self.conversation.push(Message::assistant(text.clone()));
            self.phase = AnalysisPhase::Finalizing;
            return self.finalize(&text, events);
        }

        self.conversation
            .push(Message::assistant_with_tools(text, calls.clone()));
        if let Some(step) = self.check_budget(&mut events) {
            return step;
        }
        self.pending.extend(calls);
        self.next_tool(events)
    }

    /// Give every call a unique, non-empty id.
    fn assign_call_ids(&mut self, calls: Vec<ToolCall>) -> Vec<ToolCall> {
        calls
            .into_iter()
            .map(|mut call| {
                if call.call_id.is_empty() || self.used_call_ids.contains(&call.call_id) {
                    call.call_id = format!("call_{}", self.used_call_ids.len() + 1);
                }
                self.used_call_ids.insert(call.call_id.clone());
                call
            })
            .collect()
    }

    fn next_tool(&mut self, mut events: Vec<EventPayload>) -> Step {
        let Some(call) = self.pending.pop_front() else {
            self.in_flight = None;
            self.phase = AnalysisPhase::Reasoning;
            return Step {
                events,
                effect: Effect::Generate,
            };
        };

        if self.tool_calls_made >= self.limits.max_tool_calls {
            return self.fail(FailureReason::StepLimitExceeded, events);
        }
        self.tool_calls_made += 1;

        events.push(EventPayload::ToolCall {
            call_id: call.call_id.clone(),
            tool: call.tool_name.clone(),
            message: call.display_message(),
            arguments: call.arguments_json(),
        });
        self.in_flight = Some(call.clone());
        self.phase = AnalysisPhase::Invoking;
        Step {
            events,
            effect: Effect::InvokeTool(call),
        }
    }

    fn finish_tool(&mut self, result: ToolResult) -> Step {
        let expected = match &self.in_flight {
            Some(call) if call.call_id == result.call_id => call.clone(),
            Some(call) => {
                let reason = format!(
                    "expected result for {}, got {}",
                    call.call_id, result.call_id
                );
                return self.fail(FailureReason::ToolContract(reason), Vec::new());
            }
            None => {
                return self.fail(
                    FailureReason::ToolContract("no tool call in flight".to_string()),
                    Vec::new(),
                );
            }
        };

        let mut events = vec![EventPayload::ToolResult {
            call_id: expected.call_id.clone(),
            tool: expected.tool_name.clone(),
            success: result.is_success(),
            message: result.display_message(),
            result: result.output().map(str::to_string),
        }];

        self.conversation
            .push(Message::tool(expected.call_id, result.model_content()));
        self.in_flight = None;
        if let Some(step) = self.check_budget(&mut events) {
            return step;
        }
        self.next_tool(events)
    }

    fn finalize(&mut self, text: &str, mut events: Vec<EventPayload>) -> Step {
        match parse_report(text) {
            Ok(report) => {
                let report = report.with_repo_url_fallback(self.repo.as_str());
                self.report = Some(report.clone());
                self.phase = AnalysisPhase::Completed;
                events.push(EventPayload::Complete(report));
                Step {
                    events,
                    effect: Effect::Finish,
                }
            }
            Err(e) if !self.correction_used => {
                self.correction_used = true;
                self.conversation
                    .push(Message::user(AnalysisPromptTemplate::correction(
                        &e.to_string(),
                    )));
                if let Some(step) = self.check_budget(&mut events) {
                    return step;
                }
                self.phase = AnalysisPhase::Reasoning;
                Step {
                    events,
                    effect: Effect::Generate,
                }
            }
            Err(e) => self.fail(FailureReason::InvalidResult(e), events),
        }
    }

    fn check_budget(&mut self, events: &mut Vec<EventPayload>) -> Option<Step> {
        if self.conversation.char_count() <= self.limits.max_conversation_chars {
            return None;
        }
        let limit = self.limits.max_conversation_chars;
        Some(self.fail(
            FailureReason::ConversationTooLarge { limit },
            std::mem::take(events),
        ))
    }

    fn fail(&mut self, reason: FailureReason, mut events: Vec<EventPayload>) -> Step {
        events.push(EventPayload::error(reason.to_string()));
        self.failure = Some(reason);
        self.phase = AnalysisPhase::Failed;
        self.pending.clear();
        self.in_flight = None;
        Step {
            events,
            effect: Effect::Finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::session::response::{ContentBlock, StopReason};
    use crate::tool::entities::ToolDefinition;
    use crate::tool::value_objects::ToolError;

    const REPORT: &str = r#"```json
{"summary": "Widgets", "modules": [{"name": "core", "description": "Core", "files": ["src/lib.rs"]}], "highlights": [], "principles": []}
```"#;

    fn machine(limits: AnalysisLimits) -> AnalysisMachine {
        let tools = ToolSpec::new()
            .register(ToolDefinition::new("read_file", "Read a file"))
            .register(ToolDefinition::new("list_directory", "List a directory"));
        AnalysisMachine::new(
            RepoRef::parse("github.com/acme/widgets").unwrap(),
            Locale::default(),
            tools,
            limits,
        )
    }

    fn tool_turn(calls: &[(&str, &str, &str)]) -> LlmResponse {
        LlmResponse {
            content: calls
                .iter()
                .map(|(id, name, path)| ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: [("path".to_string(), serde_json::json!(path))]
                        .into_iter()
                        .collect(),
                })
                .collect(),
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        }
    }

    fn kinds(events: &[EventPayload]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn begin_emits_start_and_requests_generation() {
        let mut m = machine(AnalysisLimits::default());
        let step = m.step(MachineInput::Begin);
        assert_eq!(
            step.events,
            vec![EventPayload::Start {
                repo_url: "github.com/acme/widgets".to_string()
            }]
        );
        assert_eq!(step.effect, Effect::Generate);
        assert_eq!(m.phase(), AnalysisPhase::Reasoning);
        assert_eq!(m.conversation().len(), 2);
    }

    #[test]
    fn streamed_turn_without_tools_completes() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);

        let (head, tail) = REPORT.split_at(20);
        assert_eq!(m.step(MachineInput::TextDelta(head.to_string())).events.len(), 1);
        assert!(m.turn_started());
        m.step(MachineInput::TextDelta(tail.to_string()));

        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text(REPORT)));
        assert_eq!(kinds(&step.events), vec![EventKind::Complete]);
        assert_eq!(step.effect, Effect::Finish);
        assert_eq!(m.phase(), AnalysisPhase::Completed);
        assert_eq!(m.generated_text(), REPORT);

        let report = m.report().unwrap();
        assert_eq!(report.repo_url, "github.com/acme/widgets");
        assert_eq!(report.modules[0].name, "core");
    }

    #[test]
    fn unstreamed_turn_emits_single_token() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text(REPORT)));
        assert_eq!(kinds(&step.events), vec![EventKind::Token, EventKind::Complete]);
        assert_eq!(m.generated_text(), REPORT);
    }

    #[test]
    fn empty_delta_is_ignored() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        assert_eq!(m.step(MachineInput::TextDelta(String::new())), Step::idle());
    }

    #[test]
    fn tool_loop_pairs_calls_and_results() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);

        let step = m.step(MachineInput::TurnCompleted(tool_turn(&[
            ("a", "list_directory", "src"),
            ("b", "read_file", "src/lib.rs"),
        ])));
        assert_eq!(kinds(&step.events), vec![EventKind::ToolCall]);
        let Effect::InvokeTool(first) = step.effect else {
            panic!("expected tool invocation");
        };
        assert_eq!(first.call_id, "a");
        assert_eq!(m.phase(), AnalysisPhase::Invoking);

        let step = m.step(MachineInput::ToolFinished(ToolResult::success(
            "a",
            "list_directory",
            "lib.rs",
        )));
        assert_eq!(kinds(&step.events), vec![EventKind::ToolResult, EventKind::ToolCall]);
        assert!(matches!(step.effect, Effect::InvokeTool(ref c) if c.call_id == "b"));

        let step = m.step(MachineInput::ToolFinished(ToolResult::failure(
            "b",
            "read_file",
            ToolError::not_found("src/lib.rs"),
        )));
        assert_eq!(kinds(&step.events), vec![EventKind::ToolResult]);
        assert_eq!(step.effect, Effect::Generate);
        assert_eq!(m.phase(), AnalysisPhase::Reasoning);
        assert_eq!(m.tool_calls_made(), 2);

        // assistant turn + two tool messages on top of the prompt pair
        assert_eq!(m.conversation().len(), 5);
        let last = m.conversation().messages().last().unwrap();
        assert!(last.content.contains("Error executing tool read_file"));

        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text(REPORT)));
        assert_eq!(m.phase(), AnalysisPhase::Completed);
        assert_eq!(step.effect, Effect::Finish);
    }

    #[test]
    fn exceeding_tool_limit_fails() {
        let mut m = machine(AnalysisLimits {
            max_tool_calls: 1,
            ..AnalysisLimits::default()
        });
        m.step(MachineInput::Begin);
        m.step(MachineInput::TurnCompleted(tool_turn(&[
            ("a", "read_file", "x"),
            ("b", "read_file", "y"),
        ])));

        let step = m.step(MachineInput::ToolFinished(ToolResult::success("a", "read_file", "")));
        assert_eq!(kinds(&step.events), vec![EventKind::ToolResult, EventKind::Error]);
        assert_eq!(
            step.events.last().unwrap(),
            &EventPayload::error("step limit exceeded")
        );
        assert_eq!(m.phase(), AnalysisPhase::Failed);
        assert_eq!(m.failure(), Some(&FailureReason::StepLimitExceeded));

        // Late inputs produce nothing
        assert_eq!(m.step(MachineInput::TextDelta("late".into())), Step::idle());
    }

    #[test]
    fn invalid_result_gets_one_correction() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);

        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text("no json here")));
        assert_eq!(kinds(&step.events), vec![EventKind::Token]);
        assert_eq!(step.effect, Effect::Generate);
        assert_eq!(m.phase(), AnalysisPhase::Reasoning);
        assert!(m.conversation().messages().last().unwrap().content.contains("could not be used"));

        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text("still nothing")));
        assert_eq!(kinds(&step.events), vec![EventKind::Token, EventKind::Error]);
        assert_eq!(m.phase(), AnalysisPhase::Failed);
        assert_eq!(m.generated_text(), "no json herestill nothing");
    }

    #[test]
    fn correction_can_succeed() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        m.step(MachineInput::TurnCompleted(LlmResponse::from_text("{}")));
        let step = m.step(MachineInput::TurnCompleted(LlmResponse::from_text(REPORT)));
        assert_eq!(kinds(&step.events), vec![EventKind::Token, EventKind::Complete]);
    }

    #[test]
    fn cancel_is_silent_and_final() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        m.step(MachineInput::TurnCompleted(tool_turn(&[("a", "read_file", "x")])));

        assert_eq!(m.step(MachineInput::Cancel), Step::idle());
        assert_eq!(m.phase(), AnalysisPhase::Cancelled);

        let late = m.step(MachineInput::ToolFinished(ToolResult::success("a", "read_file", "")));
        assert_eq!(late, Step::idle());
    }

    #[test]
    fn mismatched_tool_result_is_contract_violation() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        m.step(MachineInput::TurnCompleted(tool_turn(&[("a", "read_file", "x")])));

        let step = m.step(MachineInput::ToolFinished(ToolResult::success("zzz", "read_file", "")));
        assert_eq!(kinds(&step.events), vec![EventKind::Error]);
        assert!(matches!(m.failure(), Some(FailureReason::ToolContract(_))));
    }

    #[test]
    fn tool_result_while_reasoning_is_contract_violation() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        let step = m.step(MachineInput::ToolFinished(ToolResult::success("a", "read_file", "")));
        assert_eq!(kinds(&step.events), vec![EventKind::Error]);
        assert!(matches!(m.failure(), Some(FailureReason::ToolContract(_))));
    }

    #[test]
    fn model_failure_is_fatal() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        let step = m.step(MachineInput::ModelFailed("rate limited".into()));
        assert_eq!(step.events, vec![EventPayload::error("model error: rate limited")]);
        assert_eq!(m.phase(), AnalysisPhase::Failed);
    }

    #[test]
    fn conversation_growth_is_bounded() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        let size = m.conversation().char_count();
        m.limits.max_conversation_chars = size + 50;

        m.step(MachineInput::TurnCompleted(tool_turn(&[("a", "read_file", "x")])));
        let step = m.step(MachineInput::ToolFinished(ToolResult::success(
            "a",
            "read_file",
            "x".repeat(100),
        )));
        assert_eq!(kinds(&step.events), vec![EventKind::ToolResult, EventKind::Error]);
        assert!(matches!(
            m.failure(),
            Some(FailureReason::ConversationTooLarge { .. })
        ));
    }

    #[test]
    fn missing_and_duplicate_call_ids_are_replaced() {
        let mut m = machine(AnalysisLimits::default());
        m.step(MachineInput::Begin);
        let step = m.step(MachineInput::TurnCompleted(tool_turn(&[
            ("", "read_file", "x"),
            ("dup", "read_file", "y"),
            ("dup", "read_file", "z"),
        ])));
        let Effect::InvokeTool(first) = step.effect else {
            panic!("expected tool invocation");
        };
        assert_eq!(first.call_id, "call_1");

        let step = m.step(MachineInput::ToolFinished(ToolResult::success("call_1", "read_file", "")));
        assert!(matches!(step.effect, Effect::InvokeTool(ref c) if c.call_id == "dup"));
        let step = m.step(MachineInput::ToolFinished(ToolResult::success("dup", "read_file", "")));
        assert!(matches!(step.effect, Effect::InvokeTool(ref c) if c.call_id == "call_3"));
    }
}
