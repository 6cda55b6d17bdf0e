//! Planning: turn a query into an ordered set of data-collection intents.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use windowscout_core::evidence::TimeRange;
use windowscout_core::plan::{Plan, PlanEntry};
use windowscout_core::provider::{Provider, ProviderRequest};
use windowscout_core::session::Session;

use crate::error::PlanningError;
use crate::settings::WorkflowSettings;

const PLANNER_SYSTEM: &str = "You are a market-window analyst. You plan data collection \
for judging whether a product's market entry window is open, closing, or closed.";

/// Asks the LLM for an analysis plan and derives plan entries from it.
pub struct Planner {
    provider: Arc<dyn Provider>,
    settings: WorkflowSettings,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>, settings: WorkflowSettings) -> Self {
        Self { provider, settings }
    }

    /// Build the plan for `session`. `memory_context` is the rendered
    /// recall of prior sessions.
    pub async fn plan(
        &self,
        session: &Session,
        memory_context: &str,
        now: DateTime<Utc>,
    ) -> Result<Plan, PlanningError> {
        let query = session.query.trim();
        if query.is_empty() {
            return Err(PlanningError::EmptyQuery);
        }

        let prompt = planning_prompt(query, &session.extra_context, memory_context);
        let request = ProviderRequest::prompt(&self.settings.model, PLANNER_SYSTEM, prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_context("stage", "planning".into())
            .with_context("session_id", session.id.to_string().into());

        let response = self.provider.complete(request).await?;
        let objective = response.message.content;
        let keywords = extract_keywords(&objective, query);
        debug!(session_id = %session.id, ?keywords, "Keywords extracted");

        let entries = build_entries(&keywords, &self.settings, now);
        info!(
            session_id = %session.id,
            keywords = keywords.len(),
            entries = entries.len(),
            "Plan built"
        );

        Ok(Plan {
            objective,
            keywords,
            entries,
        })
    }
}

fn planning_prompt(query: &str, extra_context: &str, memory_context: &str) -> String {
    let extra = if extra_context.trim().is_empty() {
        "(none)"
    } else {
        extra_context.trim()
    };
    format!(
        "User query: {query}\n\
         Additional context: {extra}\n\n\
         {memory_context}\n\n\
         Produce an analysis plan with:\n\
         1. The analysis objective in one or two sentences.\n\
         2. 3-5 search keywords as a JSON array of strings, e.g. [\"keyword one\", \"keyword two\"].\n\
         3. Which patent and search-trend data should be collected.\n\
         4. What the final report should conclude."
    )
}

/// Keywords from the first JSON array of strings in `text`. When there is
/// none, the query itself plus its words longer than two characters.
/// Blank and repeated (case-insensitive) keywords are dropped.
pub fn extract_keywords(text: &str, query: &str) -> Vec<String> {
    let from_json = first_string_array(text)
        .map(dedup_keywords)
        .filter(|k| !k.is_empty());
    if let Some(keywords) = from_json {
        return keywords;
    }

    let query = query.trim();
    let mut fallback = vec![query.to_string()];
    fallback.extend(
        query
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .map(str::to_string),
    );
    dedup_keywords(fallback)
}

fn first_string_array(text: &str) -> Option<Vec<String>> {
    for (start, _) in text.match_indices('[') {
        for (offset, _) in text[start..].match_indices(']') {
            let candidate = &text[start..=start + offset];
            if let Ok(values) = serde_json::from_str::<Vec<String>>(candidate) {
                return Some(values);
            }
        }
    }
    None
}

fn dedup_keywords(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .collect()
}

/// Patent searches for the first `max_patent_keywords` keywords, then trend
/// fetches for the first `max_trend_keywords`, all over the same window.
pub fn build_entries(
    keywords: &[String],
    settings: &WorkflowSettings,
    now: DateTime<Utc>,
) -> Vec<PlanEntry> {
    let window = TimeRange::trailing_months(settings.trend_timeframe_months, now);

    let patents = keywords
        .iter()
        .take(settings.max_patent_keywords)
        .map(|k| PlanEntry::PatentSearch {
            query: k.clone(),
            limit: settings.patent_search_limit,
        });
    let trends = keywords
        .iter()
        .take(settings.max_trend_keywords)
        .map(|k| PlanEntry::TrendFetch {
            keyword: k.clone(),
            window,
        });

    patents.chain(trends).collect()
}
