//! Session: one end-to-end analysis run.
//!
//! The session record is a small versioned value. The orchestrator moves it
//! through [`WorkflowState`]s by consuming the old record and getting a new
//! one back; every accepted transition bumps `version`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Planning,
    Fetching,
    Synthesizing,
    Reviewing,
    MemoryUpdate,
    Done,
}

impl WorkflowState {
    /// Whether the workflow graph has an edge `self → next`.
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Planning, Fetching)
                | (Fetching, Synthesizing)
                | (Synthesizing, Reviewing)
                | (Reviewing, Synthesizing)
                | (Reviewing, MemoryUpdate)
                | (MemoryUpdate, Done)
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowState::Planning => "planning",
            WorkflowState::Fetching => "fetching",
            WorkflowState::Synthesizing => "synthesizing",
            WorkflowState::Reviewing => "reviewing",
            WorkflowState::MemoryUpdate => "memory_update",
            WorkflowState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Terminal status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Review passed within the iteration ceiling.
    Completed,
    /// Review ceiling reached without a passing verdict.
    Degraded,
    /// Planning, synthesis, or every data source failed (or cancelled).
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Degraded => "degraded",
            SessionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

/// The session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub query: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_context: String,
    pub created_at: DateTime<Utc>,
    pub state: WorkflowState,
    /// Number of synthesis attempts so far.
    pub iteration: u32,
    /// Bumped on every accepted transition.
    pub version: u64,
    /// Set once the session reaches a terminal status.
    #[serde(default)]
    pub archived: bool,
}

impl Session {
    pub fn new(query: impl Into<String>, extra_context: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            query: query.into(),
            extra_context: extra_context.into(),
            created_at: Utc::now(),
            state: WorkflowState::Planning,
            iteration: 0,
            version: 0,
            archived: false,
        }
    }

    /// Move to `next`. Entering `Synthesizing` counts one iteration.
    pub fn transition(mut self, next: WorkflowState) -> Result<Self, TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError { from: self.state, to: next });
        }
        if next == WorkflowState::Synthesizing {
            self.iteration += 1;
        }
        self.state = next;
        self.version += 1;
        Ok(self)
    }

    /// Terminate from any state and archive the record.
    pub fn archive(mut self) -> Self {
        if self.state != WorkflowState::Done {
            self.state = WorkflowState::Done;
            self.version += 1;
        }
        self.archived = true;
        self
    }
}
