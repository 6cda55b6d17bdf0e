//! Condense a finished session into one long-term memory entry.

use std::sync::Arc;
use tracing::warn;
use windowscout_core::error::MemoryError;
use windowscout_core::evidence::EvidenceSlot;
use windowscout_core::memory::MemoryEntry;
use windowscout_core::plan::Plan;
use windowscout_core::provider::{Provider, ProviderRequest};
use windowscout_core::report::DraftReport;
use windowscout_core::session::{Session, SessionStatus};
use windowscout_memory::MemoryService;

use crate::settings::WorkflowSettings;

/// Characters of the final report passed to the summarizer.
const REPORT_HEAD_CHARS: usize = 500;
pub const SESSION_TAG: &str = "analysis_session";

const SUMMARY_SYSTEM: &str = "You condense market-window analyses into short notes that \
will be recalled in future sessions.";

pub struct MemoryUpdater {
    provider: Arc<dyn Provider>,
    settings: WorkflowSettings,
    memory: Arc<MemoryService>,
}

/// Evidence counts a summary is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceCounts {
    pub patents: usize,
    pub trends: usize,
    pub unavailable: usize,
}

impl EvidenceCounts {
    pub fn of(evidence: &[EvidenceSlot]) -> Self {
        Self {
            patents: evidence.iter().map(|s| s.patents().count()).sum(),
            trends: evidence.iter().filter_map(EvidenceSlot::trend_series).count(),
            unavailable: evidence.iter().filter(|s| !s.is_available()).count(),
        }
    }
}

impl MemoryUpdater {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: WorkflowSettings,
        memory: Arc<MemoryService>,
    ) -> Self {
        Self {
            provider,
            settings,
            memory,
        }
    }

    /// Summarize and append. Returns the new entry's id.
    pub async fn update(
        &self,
        session: &Session,
        plan: &Plan,
        evidence: &[EvidenceSlot],
        report: Option<&DraftReport>,
        status: SessionStatus,
    ) -> Result<String, MemoryError> {
        let counts = EvidenceCounts::of(evidence);
        let content = match self.summarize(session, counts, report, status).await {
            Some(summary) => summary,
            None => digest(session, plan, counts, report, status),
        };

        let mut entry = MemoryEntry::new(content);
        entry.tags = std::iter::once(SESSION_TAG.to_string())
            .chain(plan.keywords.iter().cloned())
            .collect();
        entry.source = Some(session.id.to_string());
        entry.importance = importance(status, evidence);

        self.memory.remember(entry).await
    }

    async fn summarize(
        &self,
        session: &Session,
        counts: EvidenceCounts,
        report: Option<&DraftReport>,
        status: SessionStatus,
    ) -> Option<String> {
        let head: String = report
            .map(|r| r.narrative.chars().take(REPORT_HEAD_CHARS).collect())
            .unwrap_or_default();
        let prompt = format!(
            "Summarize this analysis session in at most 200 words. Keep the query, the \
             conclusion, and the key figures.\n\n\
             Query: {}\nStatus: {status}\nPatent records: {}\nTrend series: {}\n\
             Unavailable sources: {}\n\nReport opening:\n{head}",
            session.query, counts.patents, counts.trends, counts.unavailable
        );
        let request = ProviderRequest::prompt(&self.settings.model, SUMMARY_SYSTEM, prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(512)
            .with_context("stage", "memory_update".into())
            .with_context("session_id", session.id.to_string().into());

        match self.provider.complete(request).await {
            Ok(response) if !response.message.content.trim().is_empty() => {
                Some(response.message.content.trim().to_string())
            }
            Ok(_) => {
                warn!(session_id = %session.id, "Empty memory summary; using digest");
                None
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Memory summary failed; using digest");
                None
            }
        }
    }
}

/// Deterministic stand-in for the LLM summary.
pub fn digest(
    session: &Session,
    plan: &Plan,
    counts: EvidenceCounts,
    report: Option<&DraftReport>,
    status: SessionStatus,
) -> String {
    let mut out = format!(
        "Query: {}\nStatus: {status}\nKeywords: {}\nEvidence: {} patent records, {} trend series, {} sources unavailable\n",
        session.query,
        plan.keywords.join(", "),
        counts.patents,
        counts.trends,
        counts.unavailable
    );
    if let Some(report) = report {
        out.push_str(&format!(
            "Risk level: {}; Window: {}\n",
            format!("{:?}", report.assessment.risk).to_lowercase(),
            format!("{:?}", report.assessment.window).to_lowercase()
        ));
    }
    out
}

/// Completed sessions matter most; sessions built on partial evidence are
/// scaled down by the share of slots that came back empty.
pub fn importance(status: SessionStatus, evidence: &[EvidenceSlot]) -> f32 {
    let base = match status {
        SessionStatus::Completed => 0.8,
        SessionStatus::Degraded => 0.5,
        SessionStatus::Failed => 0.2,
    };
    let available = if evidence.is_empty() {
        0.0
    } else {
        evidence.iter().filter(|s| s.is_available()).count() as f32 / evidence.len() as f32
    };
    base * (0.5 + 0.5 * available)
}
