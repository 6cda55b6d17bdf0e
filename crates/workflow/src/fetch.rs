//! Concurrent evidence collection.
//!
//! Every plan entry is dispatched at once, each under its own deadline.
//! Slots come back in plan order no matter which call finishes first, and
//! adapter failures are folded into `Unavailable` slots here so they never
//! reach the orchestrator as errors.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use windowscout_core::adapter::{PatentSearch, TrendData};
use windowscout_core::event::{DomainEvent, EventBus};
use windowscout_core::evidence::{
    EvidenceItem, EvidenceOutcome, EvidencePayload, EvidenceSlot, PatentRecord, TrendSeries,
    UnavailableReason,
};
use windowscout_core::plan::{Plan, PlanEntry};
use windowscout_core::session::SessionId;

pub struct Fetcher {
    patents: Arc<dyn PatentSearch>,
    trends: Arc<dyn TrendData>,
    timeout: Duration,
    events: Arc<EventBus>,
}

impl Fetcher {
    pub fn new(
        patents: Arc<dyn PatentSearch>,
        trends: Arc<dyn TrendData>,
        timeout: Duration,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            patents,
            trends,
            timeout,
            events,
        }
    }

    /// Fetch every entry of `plan`. The result has one slot per entry, and
    /// `slots[i].index == i`.
    pub async fn fetch_all(&self, session_id: &SessionId, plan: &Plan) -> Vec<EvidenceSlot> {
        let calls = plan
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.fetch_one(session_id, index, entry));
        join_all(calls).await
    }

    async fn fetch_one(&self, session_id: &SessionId, index: usize, entry: &PlanEntry) -> EvidenceSlot {
        let started = Instant::now();
        let label = entry.label();

        let result = match entry {
            PlanEntry::PatentSearch { query, limit } => {
                let source = self.patents.name().to_string();
                tokio::time::timeout(self.timeout, self.patents.search(query, *limit))
                    .await
                    .map(|r| r.map(|records| patent_items(&source, records)))
            }
            PlanEntry::TrendFetch { keyword, window } => {
                let source = self.trends.name().to_string();
                tokio::time::timeout(self.timeout, self.trends.fetch(keyword, window))
                    .await
                    .map(|r| r.map(|series| trend_items(&source, series)))
            }
        };

        let outcome = match result {
            Ok(Ok(items)) => EvidenceOutcome::Available { items },
            Ok(Err(err)) => {
                warn!(session_id = %session_id, entry = %label, error = %err, "Evidence unavailable");
                EvidenceOutcome::Unavailable {
                    reason: UnavailableReason::from(&err),
                }
            }
            Err(_) => {
                warn!(
                    session_id = %session_id,
                    entry = %label,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Evidence fetch timed out"
                );
                EvidenceOutcome::Unavailable {
                    reason: UnavailableReason::TimedOut,
                }
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let (items, unavailable) = match &outcome {
            EvidenceOutcome::Available { items } => (items.len(), None),
            EvidenceOutcome::Unavailable { reason } => (0, Some(*reason)),
        };
        debug!(session_id = %session_id, entry = %label, items, duration_ms, "Entry fetched");
        self.events.publish(DomainEvent::EvidenceFetched {
            session_id: session_id.to_string(),
            entry: label,
            items,
            unavailable,
            duration_ms,
            timestamp: Utc::now(),
        });

        EvidenceSlot {
            index,
            entry: entry.clone(),
            outcome,
        }
    }
}

fn patent_items(source: &str, records: Vec<PatentRecord>) -> Vec<EvidenceItem> {
    let fetched_at = Utc::now();
    records
        .into_iter()
        .map(|record| EvidenceItem {
            source: source.to_string(),
            fetched_at,
            payload: EvidencePayload::Patent(record),
        })
        .collect()
}

fn trend_items(source: &str, series: TrendSeries) -> Vec<EvidenceItem> {
    let fetched_at = Utc::now();
    let TrendSeries { keyword, points } = series;
    points
        .into_iter()
        .map(|point| EvidenceItem {
            source: source.to_string(),
            fetched_at,
            payload: EvidencePayload::TrendPoint {
                keyword: keyword.clone(),
                point,
            },
        })
        .collect()
}

/// True when at least one slot carries data.
pub fn any_available(slots: &[EvidenceSlot]) -> bool {
    slots.iter().any(EvidenceSlot::is_available)
}
