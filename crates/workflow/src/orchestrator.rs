//! The session state machine.
//!
//! ```text
//! PLANNING → FETCHING → SYNTHESIZING ⇄ REVIEWING → MEMORY_UPDATE → DONE
//! ```
//!
//! The review loop is bounded by `max_review_iterations`. Every failure
//! path still produces a [`SessionOutcome`]; `run` never returns an error.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use windowscout_core::adapter::{PatentSearch, TrendData};
use windowscout_core::event::{DomainEvent, EventBus};
use windowscout_core::evidence::EvidenceSlot;
use windowscout_core::plan::Plan;
use windowscout_core::provider::Provider;
use windowscout_core::report::{DraftReport, ReviewVerdict};
use windowscout_core::session::{Session, SessionStatus, WorkflowState};
use windowscout_memory::{MemoryService, format_context};

use crate::analysis::PatentAnalyst;
use crate::archive::{InMemoryArchive, SessionArchive};
use crate::error::{PlanningError, WorkflowError};
use crate::fetch::{Fetcher, any_available};
use crate::memory_update::MemoryUpdater;
use crate::outcome::{SessionOutcome, TraceStep};
use crate::planner::Planner;
use crate::review::{ReviewGate, RuleReviewGate};
use crate::settings::WorkflowSettings;
use crate::synthesis::Synthesizer;

/// Feedback recorded when the gate itself could not decide.
const GATE_ERROR_FEEDBACK: &str = "Automated review could not be completed. Re-check that every \
required section is present, figures match the evidence, and a risk level is stated.";

/// Everything a session accumulates on its way through the states.
#[derive(Default)]
struct SessionRecord {
    plan: Option<Plan>,
    evidence: Vec<EvidenceSlot>,
    patent_analysis: Option<String>,
    revisions: Vec<DraftReport>,
    verdicts: Vec<ReviewVerdict>,
    trace: Vec<TraceStep>,
    memory_written: bool,
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    patents: Arc<dyn PatentSearch>,
    trends: Arc<dyn TrendData>,
    memory: Arc<MemoryService>,
    gate: Arc<dyn ReviewGate>,
    archive: Arc<dyn SessionArchive>,
    events: Arc<EventBus>,
    settings: WorkflowSettings,
}

impl Orchestrator {
    /// Rule review gate, in-memory archive and a private event bus unless
    /// overridden.
    pub fn new(
        provider: Arc<dyn Provider>,
        patents: Arc<dyn PatentSearch>,
        trends: Arc<dyn TrendData>,
        memory: Arc<MemoryService>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            provider,
            patents,
            trends,
            memory,
            gate: Arc::new(RuleReviewGate::new()),
            archive: Arc::new(InMemoryArchive::new()),
            events: Arc::new(EventBus::default()),
            settings,
        }
    }

    pub fn with_review_gate(mut self, gate: Arc<dyn ReviewGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn SessionArchive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Run one session to a terminal status.
    pub async fn run(&self, query: &str, extra_context: &str, cancel: &CancellationToken) -> SessionOutcome {
        let started = Instant::now();
        let mut session = Session::new(query.trim(), extra_context.trim());
        let mut record = SessionRecord::default();

        info!(session_id = %session.id, query = %session.query, "Session started");
        self.events.publish(DomainEvent::SessionStarted {
            session_id: session.id.to_string(),
            query: session.query.clone(),
            timestamp: Utc::now(),
        });

        let result = self.drive(&mut session, &mut record, cancel, started).await;
        let (status, cause) = match result {
            Ok(SessionStatus::Degraded) => (
                SessionStatus::Degraded,
                Some(format!(
                    "report did not pass review within {} iterations",
                    self.settings.max_review_iterations
                )),
            ),
            Ok(status) => (status, None),
            Err(e) => {
                error!(session_id = %session.id, state = %session.state, error = %e, "Session failed");
                (SessionStatus::Failed, Some(e.public_cause()))
            }
        };

        let session = session.archive();
        let duration_ms = started.elapsed().as_millis() as u64;
        let outcome = SessionOutcome {
            session,
            status,
            cause,
            plan: record.plan,
            evidence: record.evidence,
            patent_analysis: record.patent_analysis,
            revisions: record.revisions,
            verdicts: record.verdicts,
            trace: record.trace,
            memory_written: record.memory_written,
            finished_at: Utc::now(),
            duration_ms,
        };

        if let Err(e) = self.archive.save(&outcome).await {
            warn!(session_id = %outcome.session.id, error = %e, "Failed to archive session");
        }

        info!(
            session_id = %outcome.session.id,
            status = %outcome.status,
            iteration = outcome.session.iteration,
            duration_ms,
            "Session finished"
        );
        self.events.publish(DomainEvent::SessionFinished {
            session_id: outcome.session.id.to_string(),
            status: outcome.status,
            cause: outcome.cause.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });
        outcome
    }

    async fn drive(
        &self,
        session: &mut Session,
        record: &mut SessionRecord,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<SessionStatus, WorkflowError> {
        // Planning
        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        self.record_state(session, record, started);
        if session.query.is_empty() {
            return Err(PlanningError::EmptyQuery.into());
        }
        let now = Utc::now();
        let memories = match self.memory.recall(&session.query, now).await {
            Ok(m) => m,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Memory recall failed; planning without it");
                Vec::new()
            }
        };
        let planner = Planner::new(self.provider.clone(), self.settings.clone());
        let plan = planner.plan(session, &format_context(&memories), now).await?;
        record.plan = Some(plan.clone());

        // Fetching
        self.enter(session, WorkflowState::Fetching, record, cancel, started)?;
        let fetcher = Fetcher::new(
            self.patents.clone(),
            self.trends.clone(),
            self.settings.fetch_timeout,
            self.events.clone(),
        );
        record.evidence = fetcher.fetch_all(&session.id, &plan).await;
        if !any_available(&record.evidence) {
            return Err(WorkflowError::AllSourcesUnavailable);
        }
        if self.settings.patent_analysis {
            let analyst = PatentAnalyst::new(self.provider.clone(), self.settings.clone());
            record.patent_analysis = match analyst.analyze(session, &record.evidence).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Patent analysis failed; synthesizing from the digest");
                    None
                }
            };
        }

        // Synthesize / review loop
        let synthesizer = Synthesizer::new(self.provider.clone(), self.settings.clone());
        let status = loop {
            self.enter(session, WorkflowState::Synthesizing, record, cancel, started)?;
            let draft = synthesizer
                .synthesize(
                    session,
                    &plan,
                    &record.evidence,
                    record.patent_analysis.as_deref(),
                    &record.verdicts,
                    session.iteration,
                )
                .await?;
            record.revisions.push(draft.clone());

            self.enter(session, WorkflowState::Reviewing, record, cancel, started)?;
            let verdict = match self.gate.review(&draft, &plan).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(session_id = %session.id, gate = self.gate.name(), error = %e, "Review gate failed");
                    ReviewVerdict::fail(draft.revision, GATE_ERROR_FEEDBACK)
                }
            };
            info!(
                session_id = %session.id,
                iteration = session.iteration,
                passed = verdict.passed,
                score = ?verdict.score,
                "Review completed"
            );
            self.events.publish(DomainEvent::ReviewCompleted {
                session_id: session.id.to_string(),
                revision: verdict.revision,
                passed: verdict.passed,
                timestamp: Utc::now(),
            });
            let passed = verdict.passed;
            record.verdicts.push(verdict);

            if passed {
                break SessionStatus::Completed;
            }
            if session.iteration >= self.settings.max_review_iterations {
                warn!(
                    session_id = %session.id,
                    iteration = session.iteration,
                    "Review ceiling reached; finishing degraded"
                );
                break SessionStatus::Degraded;
            }
        };

        // Memory update
        self.enter(session, WorkflowState::MemoryUpdate, record, cancel, started)?;
        let updater = MemoryUpdater::new(
            self.provider.clone(),
            self.settings.clone(),
            self.memory.clone(),
        );
        let written = updater
            .update(session, &plan, &record.evidence, record.revisions.last(), status)
            .await;
        match written {
            Ok(_) => record.memory_written = true,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Memory write failed; status unchanged");
            }
        }

        self.enter(session, WorkflowState::Done, record, cancel, started)?;
        Ok(status)
    }

    /// Check for cancellation, move to `next`, and record it.
    fn enter(
        &self,
        session: &mut Session,
        next: WorkflowState,
        record: &mut SessionRecord,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<(), WorkflowError> {
        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        *session = session.clone().transition(next)?;
        self.record_state(session, record, started);
        Ok(())
    }

    fn record_state(&self, session: &Session, record: &mut SessionRecord, started: Instant) {
        debug!(
            session_id = %session.id,
            state = %session.state,
            iteration = session.iteration,
            version = session.version,
            "State entered"
        );
        record.trace.push(TraceStep {
            state: session.state,
            iteration: session.iteration,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        self.events.publish(DomainEvent::StateEntered {
            session_id: session.id.to_string(),
            state: session.state,
            iteration: session.iteration,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        FailingGate, FailingMemoryStore, ScriptedGate, SequentialMockProvider, make_text_response,
        passing_report,
    };
    use std::time::Duration;
    use windowscout_core::error::{AdapterError, ProviderError};
    use windowscout_core::evidence::{EvidenceOutcome, UnavailableReason};
    use windowscout_core::memory::MemoryStore;
    use windowscout_core::plan::PlanEntry;
    use windowscout_memory::{InMemoryBackend, RetentionPolicy};
    use windowscout_sources::{MockPatentSearch, MockTrendData};

    const PLAN_REPLY: &str = "Objective: judge the market window for smart water bottles.\n\
        Keywords: [\"smart water bottle\", \"hydration tracking\"]";

    struct Harness {
        provider: Arc<SequentialMockProvider>,
        store: Arc<InMemoryBackend>,
        archive: Arc<InMemoryArchive>,
        orchestrator: Orchestrator,
    }

    /// Harness with patent analysis off, so scripts hold only plan,
    /// synthesis and summary replies.
    fn harness(
        replies: Vec<Result<windowscout_core::ProviderResponse, ProviderError>>,
        patents: Arc<dyn PatentSearch>,
        trends: Arc<dyn TrendData>,
        gate: Arc<dyn ReviewGate>,
    ) -> Harness {
        harness_with(replies, patents, trends, gate, false)
    }

    fn harness_with(
        replies: Vec<Result<windowscout_core::ProviderResponse, ProviderError>>,
        patents: Arc<dyn PatentSearch>,
        trends: Arc<dyn TrendData>,
        gate: Arc<dyn ReviewGate>,
        patent_analysis: bool,
    ) -> Harness {
        let provider = Arc::new(SequentialMockProvider::new(replies));
        let store = Arc::new(InMemoryBackend::new());
        let archive = Arc::new(InMemoryArchive::new());
        let memory = Arc::new(MemoryService::new(store.clone(), RetentionPolicy::default()));
        let settings = WorkflowSettings {
            fetch_timeout: Duration::from_secs(2),
            patent_analysis,
            ..WorkflowSettings::default()
        };
        let orchestrator = Orchestrator::new(provider.clone(), patents, trends, memory, settings)
            .with_review_gate(gate)
            .with_archive(archive.clone());
        Harness {
            provider,
            store,
            archive,
            orchestrator,
        }
    }

    fn text(s: &str) -> Result<windowscout_core::ProviderResponse, ProviderError> {
        Ok(make_text_response(s))
    }

    fn states(outcome: &SessionOutcome) -> Vec<WorkflowState> {
        outcome.trace.iter().map(|t| t.state).collect()
    }

    #[tokio::test]
    async fn passing_review_completes_in_one_iteration() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text(&passing_report("smart water bottle")),
                text("Smart water bottles: window open."),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h
            .orchestrator
            .run("smart water bottle patents", "", &CancellationToken::new())
            .await;

        assert_eq!(outcome.status, SessionStatus::Completed, "cause: {:?}", outcome.cause);
        assert_eq!(outcome.session.iteration, 1);
        assert!(outcome.cause.is_none());
        assert!(outcome.session.archived);
        assert_eq!(outcome.session.state, WorkflowState::Done);
        assert_eq!(
            states(&outcome),
            vec![
                WorkflowState::Planning,
                WorkflowState::Fetching,
                WorkflowState::Synthesizing,
                WorkflowState::Reviewing,
                WorkflowState::MemoryUpdate,
                WorkflowState::Done,
            ]
        );
        // 2 patent searches + 2 trend fetches
        assert_eq!(outcome.evidence.len(), 4);
        assert!(outcome.evidence.iter().all(|s| s.is_available()));
        assert!(outcome.memory_written);
        assert_eq!(h.store.count().await.unwrap(), 1);
        assert_eq!(h.provider.call_count(), 3);
        assert!(h.archive.load(&outcome.session.id.0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fail_fail_pass_accumulates_feedback() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text("draft one"),
                text("draft two"),
                text("draft three"),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(ScriptedGate::new(vec![
                (false, "Add the risk section."),
                (false, "Quantify the trend."),
                (true, ""),
            ])),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.session.iteration, 3);
        assert_eq!(outcome.revisions.len(), 3);
        assert_eq!(outcome.verdicts.len(), 3);
        assert_eq!(outcome.report().unwrap().narrative, "draft three");

        let prompts = h.provider.prompts();
        // plan, three syntheses, summary
        assert_eq!(prompts.len(), 5);
        assert!(!prompts[1].contains("Reviewer feedback"));
        assert!(prompts[2].contains("Add the risk section."));
        assert!(!prompts[2].contains("Quantify the trend."));
        assert!(prompts[3].contains("Add the risk section."));
        assert!(prompts[3].contains("Quantify the trend."));
    }

    #[tokio::test]
    async fn ceiling_reached_while_failing_is_degraded() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text("draft one"),
                text("draft two"),
                text("draft three"),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(ScriptedGate::always_fail()),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Degraded);
        assert_eq!(outcome.session.iteration, 3);
        assert_eq!(outcome.report().unwrap().revision, 3);
        assert_eq!(outcome.report().unwrap().narrative, "draft three");
        assert!(outcome.cause.as_deref().unwrap().contains("3 iterations"));
        assert!(outcome.memory_written);
        let max_iteration = outcome.trace.iter().map(|t| t.iteration).max().unwrap();
        assert_eq!(max_iteration, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn trend_timeout_still_completes() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text(&passing_report("smart water bottle")),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new().with_delay(Duration::from_secs(600))),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        for slot in &outcome.evidence {
            match &slot.entry {
                PlanEntry::PatentSearch { .. } => assert!(slot.is_available()),
                PlanEntry::TrendFetch { .. } => assert_eq!(
                    slot.outcome,
                    EvidenceOutcome::Unavailable { reason: UnavailableReason::TimedOut }
                ),
            }
        }
        let synthesis_prompt = &h.provider.prompts()[1];
        assert!(synthesis_prompt.contains("unavailable (timed out)"));
    }

    #[tokio::test]
    async fn every_source_failing_fails_the_session() {
        let h = harness(
            vec![text(PLAN_REPLY)],
            Arc::new(MockPatentSearch::failing(AdapterError::Unavailable("down".into()))),
            Arc::new(MockTrendData::failing(AdapterError::RateLimited { retry_after_secs: 30 })),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        assert!(outcome.cause.as_deref().unwrap().contains("every data source"));
        assert!(outcome.revisions.is_empty());
        assert!(!outcome.memory_written);
        assert_eq!(h.store.count().await.unwrap(), 0);
        assert!(outcome.session.archived);
    }

    #[tokio::test]
    async fn empty_query_fails_without_llm_call() {
        let h = harness(
            vec![],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h.orchestrator.run("   ", "", &CancellationToken::new()).await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.cause.as_deref(), Some("query is empty"));
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_hides_provider_message() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "internal trace id=abc123".into(),
                }),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        let cause = outcome.cause.unwrap();
        assert!(cause.starts_with("report synthesis failed"));
        assert!(!cause.contains("abc123"));
    }

    #[tokio::test]
    async fn planning_failure_is_fatal() {
        let h = harness(
            vec![Err(ProviderError::Network("connection refused".into()))],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.cause.as_deref(), Some("planning failed: language model is unavailable"));
        assert!(outcome.plan.is_none());
    }

    #[tokio::test]
    async fn cancelled_session_fails() {
        let h = harness(
            vec![],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = h.orchestrator.run("smart water bottle", "", &cancel).await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.cause.as_deref(), Some("session cancelled"));
        assert!(outcome.session.archived);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn cancelling_parent_token_cancels_session() {
        let h = harness(
            vec![],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let shutdown = CancellationToken::new();
        let session_token = shutdown.child_token();
        shutdown.cancel();

        let outcome = h.orchestrator.run("smart water bottle", "", &session_token).await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.cause.as_deref(), Some("session cancelled"));
        assert!(outcome.trace.is_empty());
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn patent_analysis_feeds_synthesis() {
        let h = harness_with(
            vec![
                text(PLAN_REPLY),
                text("### Patent barriers\nUS20240001 covers cap-based intake sensing."),
                text(&passing_report("smart water bottle")),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
            true,
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(
            outcome.patent_analysis.as_deref(),
            Some("### Patent barriers\nUS20240001 covers cap-based intake sensing.")
        );
        let prompts = h.provider.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[1].contains("### Competitor groups"));
        assert!(prompts[2].contains("## Patent landscape analysis"));
        assert!(prompts[2].contains("cap-based intake sensing"));
    }

    #[tokio::test]
    async fn failed_patent_analysis_falls_back_to_digest() {
        let h = harness_with(
            vec![
                text(PLAN_REPLY),
                Err(ProviderError::Timeout("analysis".into())),
                text(&passing_report("smart water bottle")),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
            true,
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert!(outcome.patent_analysis.is_none());
        let synthesis_prompt = &h.provider.prompts()[2];
        assert!(!synthesis_prompt.contains("## Patent landscape analysis"));
        assert!(synthesis_prompt.contains("## Patent evidence"));
    }

    #[tokio::test]
    async fn cancel_during_fetch_stops_before_synthesis() {
        let h = harness(
            vec![text(PLAN_REPLY)],
            Arc::new(MockPatentSearch::new().with_delay(Duration::from_millis(100))),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let cancel = CancellationToken::new();
        let mut rx = h.orchestrator.event_bus().subscribe();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let DomainEvent::StateEntered { state: WorkflowState::Fetching, .. } = event.as_ref() {
                    canceller.cancel();
                    break;
                }
            }
        });

        let outcome = h.orchestrator.run("smart water bottle", "", &cancel).await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.cause.as_deref(), Some("session cancelled"));
        // The in-flight fetch finished; its results are kept but unused.
        assert_eq!(outcome.evidence.len(), 4);
        assert!(outcome.revisions.is_empty());
        assert_eq!(h.provider.call_count(), 1);
    }

    #[tokio::test]
    async fn gate_error_becomes_failing_verdict() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text("draft one"),
                text("draft two"),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(FailingGate::then_pass(1)),
        );
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.session.iteration, 2);
        assert!(!outcome.verdicts[0].passed);
        assert_eq!(outcome.verdicts[0].feedback, GATE_ERROR_FEEDBACK);
    }

    #[tokio::test]
    async fn memory_write_failure_keeps_status() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text(PLAN_REPLY),
            text(&passing_report("smart water bottle")),
            text("summary"),
        ]));
        let memory = Arc::new(MemoryService::new(
            Arc::new(FailingMemoryStore),
            RetentionPolicy::default(),
        ));
        let orchestrator = Orchestrator::new(
            provider,
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            memory,
            WorkflowSettings {
                patent_analysis: false,
                ..WorkflowSettings::default()
            },
        );
        let outcome = orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert!(!outcome.memory_written);
        assert!(outcome.cause.is_none());
    }

    #[tokio::test]
    async fn prior_sessions_feed_the_planner() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text(&passing_report("smart water bottle")),
                text("Smart water bottles looked open in 2026."),
                text(PLAN_REPLY),
                text(&passing_report("smart water bottle")),
                text("second summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;
        h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        let prompts = h.provider.prompts();
        assert!(prompts[0].contains("No prior sessions on record."));
        assert!(prompts[3].contains("Smart water bottles looked open in 2026."));
        assert_eq!(h.archive.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn events_trace_the_session() {
        let h = harness(
            vec![
                text(PLAN_REPLY),
                text(&passing_report("smart water bottle")),
                text("summary"),
            ],
            Arc::new(MockPatentSearch::new()),
            Arc::new(MockTrendData::new()),
            Arc::new(RuleReviewGate::new()),
        );
        let mut rx = h.orchestrator.event_bus().subscribe();
        let outcome = h.orchestrator.run("smart water bottle", "", &CancellationToken::new()).await;

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(match event.as_ref() {
                DomainEvent::SessionStarted { .. } => "started",
                DomainEvent::StateEntered { .. } => "state",
                DomainEvent::EvidenceFetched { .. } => "fetched",
                DomainEvent::ReviewCompleted { .. } => "review",
                DomainEvent::SessionFinished { status, .. } => {
                    assert_eq!(*status, outcome.status);
                    "finished"
                }
            });
        }
        assert_eq!(names.first(), Some(&"started"));
        assert_eq!(names.last(), Some(&"finished"));
        assert_eq!(names.iter().filter(|n| **n == "state").count(), 6);
        assert_eq!(names.iter().filter(|n| **n == "fetched").count(), 4);
        assert_eq!(names.iter().filter(|n| **n == "review").count(), 1);
    }
}
