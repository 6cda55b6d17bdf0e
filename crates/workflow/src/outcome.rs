//! What a finished session leaves behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use windowscout_core::evidence::EvidenceSlot;
use windowscout_core::plan::Plan;
use windowscout_core::report::{DraftReport, ReviewVerdict};
use windowscout_core::session::{Session, SessionStatus, WorkflowState};

/// One visited state, in visiting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub state: WorkflowState,
    pub iteration: u32,
    /// Milliseconds since the session started.
    pub elapsed_ms: u64,
}

/// The archived result of one session. `status` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session: Session,
    pub status: SessionStatus,
    /// Why the session failed or degraded. Never a raw provider message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub evidence: Vec<EvidenceSlot>,
    /// LLM read of the patent evidence, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_analysis: Option<String>,
    /// Every draft, oldest first.
    #[serde(default)]
    pub revisions: Vec<DraftReport>,
    /// One verdict per reviewed revision.
    #[serde(default)]
    pub verdicts: Vec<ReviewVerdict>,
    #[serde(default)]
    pub trace: Vec<TraceStep>,
    pub memory_written: bool,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SessionOutcome {
    /// The final report: the last revision written.
    pub fn report(&self) -> Option<&DraftReport> {
        self.revisions.last()
    }

    pub fn is_failed(&self) -> bool {
        self.status == SessionStatus::Failed
    }

    /// `(available, total)` evidence slots.
    pub fn evidence_coverage(&self) -> (usize, usize) {
        let available = self.evidence.iter().filter(|s| s.is_available()).count();
        (available, self.evidence.len())
    }
}
