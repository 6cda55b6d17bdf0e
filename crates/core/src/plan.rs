//! Plan: the ordered data-collection intents derived from a query.

use serde::{Deserialize, Serialize};

use crate::evidence::TimeRange;

/// One data-collection intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEntry {
    /// Search patents matching `query`, at most `limit` records.
    PatentSearch { query: String, limit: usize },
    /// Fetch search interest for `keyword` over `window`.
    TrendFetch { keyword: String, window: TimeRange },
}

impl PlanEntry {
    /// Short label used in logs and reports.
    pub fn label(&self) -> String {
        match self {
            PlanEntry::PatentSearch { query, .. } => format!("patents: {query}"),
            PlanEntry::TrendFetch { keyword, .. } => format!("trend: {keyword}"),
        }
    }
}

/// The plan produced by the planning step. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// The planner's free-text analysis objective.
    pub objective: String,
    /// Keywords extracted from the planner output.
    pub keywords: Vec<String>,
    /// Entries in dispatch order.
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn patent_queries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::PatentSearch { query, .. } => Some(query.as_str()),
            PlanEntry::TrendFetch { .. } => None,
        })
    }

    pub fn trend_keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::TrendFetch { keyword, .. } => Some(keyword.as_str()),
            PlanEntry::PatentSearch { .. } => None,
        })
    }
}
