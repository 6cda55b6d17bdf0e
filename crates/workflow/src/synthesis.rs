//! Report synthesis: evidence digests in, Markdown draft out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;
use windowscout_core::evidence::{EvidenceOutcome, EvidenceSlot, PatentRecord, TrendSummary};
use windowscout_core::plan::Plan;
use windowscout_core::provider::{Provider, ProviderRequest};
use windowscout_core::report::{DraftReport, ReviewVerdict};
use windowscout_core::session::Session;

use crate::error::SynthesisError;
use crate::settings::WorkflowSettings;

/// Records beyond this many unique patents are left out of the prompt.
pub const PATENT_DIGEST_LIMIT: usize = 30;
const ABSTRACT_CHARS: usize = 200;

/// Section headings every report carries, in order.
pub const REPORT_SECTIONS: [&str; 6] = [
    "Executive Summary",
    "Patent Landscape",
    "Market Trend",
    "Window Assessment",
    "Risk Assessment",
    "Recommendations",
];

const SYNTHESIS_SYSTEM: &str = "You are a market-window analyst writing decision reports. \
Ground every claim in the supplied evidence and say plainly when evidence is missing.";

pub struct Synthesizer {
    provider: Arc<dyn Provider>,
    settings: WorkflowSettings,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn Provider>, settings: WorkflowSettings) -> Self {
        Self { provider, settings }
    }

    /// Write revision `revision`. `feedback` holds every earlier verdict.
    pub async fn synthesize(
        &self,
        session: &Session,
        plan: &Plan,
        evidence: &[EvidenceSlot],
        analysis: Option<&str>,
        feedback: &[ReviewVerdict],
        revision: u32,
    ) -> Result<DraftReport, SynthesisError> {
        let prompt = synthesis_prompt(session, plan, evidence, analysis, feedback);
        let request = ProviderRequest::prompt(&self.settings.model, SYNTHESIS_SYSTEM, prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_context("stage", "synthesis".into())
            .with_context("session_id", session.id.to_string().into())
            .with_context("revision", revision.into());

        let response = self.provider.complete(request).await?;
        let draft = DraftReport::new(revision, response.message.content);
        info!(
            session_id = %session.id,
            revision,
            chars = draft.narrative.len(),
            risk = ?draft.assessment.risk,
            window = ?draft.assessment.window,
            "Draft report written"
        );
        Ok(draft)
    }
}

/// The full synthesis prompt.
pub fn synthesis_prompt(
    session: &Session,
    plan: &Plan,
    evidence: &[EvidenceSlot],
    analysis: Option<&str>,
    feedback: &[ReviewVerdict],
) -> String {
    let mut out = format!("# Market window analysis\n\nQuery: {}\n", session.query);
    if !session.extra_context.trim().is_empty() {
        out.push_str(&format!("Additional context: {}\n", session.extra_context.trim()));
    }
    out.push_str(&format!("Keywords: {}\n\n", plan.keywords.join(", ")));
    out.push_str(&format!("## Analysis plan\n{}\n\n", plan.objective.trim()));

    out.push_str(&patent_digest(evidence));
    out.push('\n');
    if let Some(analysis) = analysis.map(str::trim).filter(|a| !a.is_empty()) {
        out.push_str(&format!("## Patent landscape analysis\n{analysis}\n\n"));
    }
    out.push_str(&trend_digest(evidence));
    out.push('\n');

    let notes = unavailable_notes(evidence);
    if !notes.is_empty() {
        out.push_str("## Unavailable evidence\n");
        out.push_str("The following sources returned no data. Do not invent figures for them.\n");
        out.push_str(&notes);
        out.push('\n');
    }

    if !feedback.is_empty() {
        out.push_str("## Reviewer feedback on earlier revisions\n");
        out.push_str("Address every point below in this revision.\n");
        for verdict in feedback {
            out.push_str(&format!(
                "### Revision {}\n{}\n",
                verdict.revision,
                verdict.feedback.trim()
            ));
        }
        out.push('\n');
    }

    out.push_str("## Output format\nWrite a Markdown report with these sections:\n");
    for section in REPORT_SECTIONS {
        out.push_str(&format!("## {section}\n"));
    }
    out.push_str(
        "In the Window Assessment section include a line `Window: open|closing|closed`.\n\
         In the Risk Assessment section include a line `Risk level: low|medium|high`.\n",
    );
    out
}

/// Unique patents (by id, first occurrence wins) across all slots, in slot
/// order, capped at [`PATENT_DIGEST_LIMIT`]. Records without an id are
/// always kept.
pub fn unique_patents(evidence: &[EvidenceSlot]) -> Vec<&PatentRecord> {
    let mut seen = HashSet::new();
    evidence
        .iter()
        .flat_map(EvidenceSlot::patents)
        .filter(|p| p.patent_id.is_empty() || seen.insert(p.patent_id.clone()))
        .take(PATENT_DIGEST_LIMIT)
        .collect()
}

pub(crate) fn patent_digest(evidence: &[EvidenceSlot]) -> String {
    let patents = unique_patents(evidence);
    let mut out = format!("## Patent evidence ({} unique records)\n", patents.len());
    if patents.is_empty() {
        out.push_str("No patent records were retrieved.\n");
        return out;
    }

    let mut assignees: HashMap<&str, usize> = HashMap::new();
    for p in &patents {
        if !p.assignee.is_empty() {
            *assignees.entry(p.assignee.as_str()).or_default() += 1;
        }
    }
    let mut top: Vec<(&str, usize)> = assignees.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    if !top.is_empty() {
        let listed: Vec<String> = top
            .iter()
            .take(5)
            .map(|(name, n)| format!("{name} ({n})"))
            .collect();
        out.push_str(&format!("Top assignees: {}\n", listed.join(", ")));
    }

    for p in patents {
        let filed = p.filing_date.as_deref().unwrap_or("unknown");
        let abstract_head: String = p.abstract_text.chars().take(ABSTRACT_CHARS).collect();
        out.push_str(&format!(
            "- {} ({}; {}; filed {}): {}\n",
            p.title, p.assignee, p.patent_id, filed, abstract_head
        ));
    }
    out
}

/// Per-keyword growth figures, highest CAGR first. Keywords with an
/// undefined CAGR sort last.
pub fn trend_summaries(evidence: &[EvidenceSlot]) -> Vec<TrendSummary> {
    let mut summaries: Vec<TrendSummary> = evidence
        .iter()
        .filter_map(EvidenceSlot::trend_series)
        .filter_map(|s| s.summary())
        .collect();
    summaries.sort_by(|a, b| {
        let a = a.cagr.unwrap_or(f64::NEG_INFINITY);
        let b = b.cagr.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    summaries
}

fn trend_digest(evidence: &[EvidenceSlot]) -> String {
    let summaries = trend_summaries(evidence);
    let mut out = String::from("## Search trend evidence\n");
    if summaries.is_empty() {
        out.push_str("No search trend series were retrieved.\n");
        return out;
    }
    out.push_str("| Keyword | Begin | End | Months | CAGR | CMGR |\n|---|---|---|---|---|---|\n");
    for s in summaries {
        out.push_str(&format!(
            "| {} | {:.1} | {:.1} | {:.0} | {} | {} |\n",
            s.keyword,
            s.begin_value,
            s.end_value,
            s.months,
            percent(s.cagr),
            percent(s.cmgr)
        ));
    }
    out
}

fn percent(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

fn unavailable_notes(evidence: &[EvidenceSlot]) -> String {
    evidence
        .iter()
        .filter_map(|slot| match &slot.outcome {
            EvidenceOutcome::Unavailable { reason } => {
                Some(format!("- {}: unavailable ({reason})\n", slot.entry.label()))
            }
            EvidenceOutcome::Available { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, make_text_response};
    use chrono::{TimeZone, Utc};
    use windowscout_core::error::ProviderError;
    use windowscout_core::evidence::{
        EvidenceItem, EvidencePayload, TimeRange, TrendPoint, UnavailableReason,
    };
    use windowscout_core::plan::PlanEntry;

    fn patent(id: &str, assignee: &str) -> EvidenceItem {
        EvidenceItem {
            source: "test".into(),
            fetched_at: Utc::now(),
            payload: EvidencePayload::Patent(PatentRecord {
                patent_id: id.into(),
                title: format!("Title {id}"),
                assignee: assignee.into(),
                abstract_text: "x".repeat(300),
                filing_date: None,
                publication_date: None,
                link: None,
            }),
        }
    }

    fn patent_slot(index: usize, items: Vec<EvidenceItem>) -> EvidenceSlot {
        EvidenceSlot {
            index,
            entry: PlanEntry::PatentSearch { query: "q".into(), limit: 50 },
            outcome: EvidenceOutcome::Available { items },
        }
    }

    fn trend_slot(index: usize, keyword: &str, begin: f64, end: f64) -> EvidenceSlot {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let items = (0..13)
            .map(|m| EvidenceItem {
                source: "test".into(),
                fetched_at: Utc::now(),
                payload: EvidencePayload::TrendPoint {
                    keyword: keyword.into(),
                    point: TrendPoint {
                        timestamp: start + chrono::Duration::days(30 * m),
                        score: if m == 12 { end } else if m == 0 { begin } else { 50.0 },
                    },
                },
            })
            .collect();
        EvidenceSlot {
            index,
            entry: PlanEntry::TrendFetch {
                keyword: keyword.into(),
                window: TimeRange::trailing_months(12, Utc::now()),
            },
            outcome: EvidenceOutcome::Available { items },
        }
    }

    fn plan() -> Plan {
        Plan {
            objective: "Judge the window.".into(),
            keywords: vec!["smart bottle".into()],
            entries: vec![],
        }
    }

    #[test]
    fn patents_deduplicated_and_capped() {
        let first: Vec<EvidenceItem> = (0..25).map(|i| patent(&format!("US{i}"), "Acme")).collect();
        let second: Vec<EvidenceItem> = (20..45).map(|i| patent(&format!("US{i}"), "Beta")).collect();
        let slots = vec![patent_slot(0, first), patent_slot(1, second)];

        let unique = unique_patents(&slots);
        assert_eq!(unique.len(), PATENT_DIGEST_LIMIT);
        // US20..US24 come from the first slot.
        assert_eq!(unique[20].assignee, "Acme");
        assert_eq!(unique[25].patent_id, "US25");
    }

    #[test]
    fn patents_without_ids_are_all_kept() {
        let items = vec![
            patent("", "Acme"),
            patent("", "Beta"),
            patent("US7", "Gamma"),
            patent("", "Delta"),
            patent("US7", "Gamma"),
        ];
        let slots = vec![patent_slot(0, items)];

        let assignees: Vec<&str> = unique_patents(&slots)
            .iter()
            .map(|p| p.assignee.as_str())
            .collect();
        assert_eq!(assignees, vec!["Acme", "Beta", "Gamma", "Delta"]);
    }

    #[test]
    fn analysis_text_goes_into_the_prompt() {
        let session = Session::new("smart water bottle", "");
        let slots = vec![patent_slot(0, vec![patent("US1", "Acme")])];
        let prompt = synthesis_prompt(
            &session,
            &plan(),
            &slots,
            Some("### Patent barriers\nAcme owns intake sensing."),
            &[],
        );
        assert!(prompt.contains("## Patent landscape analysis\n### Patent barriers\nAcme owns intake sensing."));

        let without = synthesis_prompt(&session, &plan(), &slots, Some("  "), &[]);
        assert!(!without.contains("## Patent landscape analysis"));
        assert!(without.contains("Top assignees: Acme (1)"));
    }

    #[test]
    fn trend_table_sorted_by_cagr() {
        let slots = vec![
            trend_slot(0, "flat", 50.0, 50.0),
            trend_slot(1, "rising", 20.0, 80.0),
            trend_slot(2, "dead", 0.0, 40.0),
        ];
        let summaries = trend_summaries(&slots);
        let order: Vec<&str> = summaries.iter().map(|s| s.keyword.as_str()).collect();
        assert_eq!(order, vec!["rising", "flat", "dead"]);
        assert!(summaries[2].cagr.is_none());
    }

    #[test]
    fn prompt_includes_unavailable_notes_and_all_feedback() {
        let session = Session::new("smart water bottle patents", "EU only");
        let slots = vec![
            patent_slot(0, vec![patent("US1", "Acme")]),
            EvidenceSlot {
                index: 1,
                entry: PlanEntry::TrendFetch {
                    keyword: "smart bottle".into(),
                    window: TimeRange::trailing_months(36, Utc::now()),
                },
                outcome: EvidenceOutcome::Unavailable { reason: UnavailableReason::TimedOut },
            },
        ];
        let feedback = vec![
            ReviewVerdict::fail(1, "Missing risk section."),
            ReviewVerdict::fail(2, "Cite the patent count."),
        ];

        let prompt = synthesis_prompt(&session, &plan(), &slots, None, &feedback);
        assert!(prompt.contains("EU only"));
        assert!(prompt.contains("trend: smart bottle: unavailable (timed out)"));
        assert!(prompt.contains("### Revision 1\nMissing risk section."));
        assert!(prompt.contains("### Revision 2\nCite the patent count."));
        assert!(prompt.contains("Top assignees: Acme (1)"));
        assert!(prompt.contains("No search trend series were retrieved."));
        for section in REPORT_SECTIONS {
            assert!(prompt.contains(&format!("## {section}")));
        }
    }

    #[test]
    fn abstracts_are_truncated() {
        let slots = vec![patent_slot(0, vec![patent("US1", "Acme")])];
        let digest = patent_digest(&slots);
        assert!(digest.contains(&"x".repeat(ABSTRACT_CHARS)));
        assert!(!digest.contains(&"x".repeat(ABSTRACT_CHARS + 1)));
    }

    #[tokio::test]
    async fn draft_carries_revision_and_assessment() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response(
            "## Risk Assessment\nRisk level: medium\n## Window Assessment\nWindow: open",
        ))]));
        let synth = Synthesizer::new(provider, WorkflowSettings::default());
        let draft = synth
            .synthesize(&Session::new("q", ""), &plan(), &[], None, &[], 2)
            .await
            .unwrap();
        assert_eq!(draft.revision, 2);
        assert_eq!(draft.assessment.risk, windowscout_core::RiskLevel::Medium);
        assert_eq!(draft.assessment.window, windowscout_core::WindowSignal::Open);
    }

    #[tokio::test]
    async fn provider_failure_is_synthesis_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::ContentFiltered("blocked".into()),
        )]));
        let synth = Synthesizer::new(provider, WorkflowSettings::default());
        let err = synth
            .synthesize(&Session::new("q", ""), &plan(), &[], None, &[], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Provider(ProviderError::ContentFiltered(_))));
    }
}
