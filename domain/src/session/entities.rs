//! Analysis session entity

use crate::core::error::DomainError;
use crate::core::locale::Locale;
use crate::core::repo::RepoRef;
use crate::event::{AnalysisEvent, EventKind, EventPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle status of an analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis request, from `start` to its terminal event (Entity).
///
/// The session is the single authority over the event log: [`record`]
/// refuses anything that would break the ordering rules, so a log built
/// through it always has exactly one leading `start`, at most one trailing
/// terminal event, and every `tool_result` preceded by its `tool_call`.
///
/// [`record`]: AnalysisSession::record
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    id: String,
    repo: RepoRef,
    locale: Locale,
    status: SessionStatus,
    events: Vec<AnalysisEvent>,
    open_calls: HashSet<String>,
    seen_calls: HashSet<String>,
    created_at: DateTime<Utc>,
}

impl AnalysisSession {
    pub fn new(repo: RepoRef, locale: Locale) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), repo, locale)
    }

    pub fn with_id(id: impl Into<String>, repo: RepoRef, locale: Locale) -> Self {
        Self {
            id: id.into(),
            repo,
            locale,
            status: SessionStatus::Active,
            events: Vec::new(),
            open_calls: HashSet::new(),
            seen_calls: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn events(&self) -> &[AnalysisEvent] {
        &self.events
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append an event to the log, stamping it with `now`.
    pub fn record(
        &mut self,
        payload: EventPayload,
        now: DateTime<Utc>,
    ) -> Result<AnalysisEvent, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::EventRejected(format!(
                "{} after session {}",
                payload.kind(),
                self.status
            )));
        }

        let kind = payload.kind();
        match (self.events.is_empty(), kind) {
            (true, EventKind::Start) => {}
            (true, other) => {
                return Err(DomainError::EventRejected(format!(
                    "{other} before start"
                )));
            }
            (false, EventKind::Start) => {
                return Err(DomainError::EventRejected("duplicate start".to_string()));
            }
            _ => {}
        }

        match &payload {
            EventPayload::ToolCall { call_id, .. } => {
                if !self.seen_calls.insert(call_id.clone()) {
                    return Err(DomainError::EventRejected(format!(
                        "duplicate tool_call id {call_id}"
                    )));
                }
                self.open_calls.insert(call_id.clone());
            }
            EventPayload::ToolResult { call_id, .. } => {
                if !self.open_calls.remove(call_id) {
                    return Err(DomainError::EventRejected(format!(
                        "tool_result for unknown call {call_id}"
                    )));
                }
            }
            _ => {}
        }

        match kind {
            EventKind::Complete => self.status = SessionStatus::Completed,
            EventKind::Error => self.status = SessionStatus::Failed,
            _ => {}
        }

        let event = AnalysisEvent::new(self.events.len() as u64, payload, now);
        self.events.push(event.clone());
        Ok(event)
    }

    /// Mark the session cancelled. Returns `false` if it had already ended.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Cancelled;
        true
    }

    /// Concatenation of every `token` event's content.
    pub fn generated_text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::Token { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_call_count(&self) -> usize {
        self.seen_calls.len()
    }
}
