//! Evidence: externally fetched data attached to a session.
//!
//! Every plan entry produces exactly one [`EvidenceSlot`]. A slot is either
//! available (zero or more items) or explicitly marked unavailable, so the
//! synthesizer always sees which data it is missing.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::plan::PlanEntry;

/// A patent record returned by a patent search source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Publication number (e.g., "US11234567B2"). Empty when unknown.
    #[serde(default)]
    pub patent_id: String,

    pub title: String,

    #[serde(default)]
    pub assignee: String,

    #[serde(default, rename = "abstract")]
    pub abstract_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// An inclusive time window for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// The `months` months ending at `now`.
    pub fn trailing_months(months: u32, now: DateTime<Utc>) -> Self {
        let start = now
            .checked_sub_months(Months::new(months))
            .unwrap_or_else(|| now - chrono::Duration::days(30 * i64::from(months)));
        Self { start, end: now }
    }

    /// Whole months covered by the window (at least 1).
    pub fn months(&self) -> u32 {
        let days = (self.end - self.start).num_days().max(0);
        ((days as f64 / 30.44).round() as u32).max(1)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// One sample of search interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    /// Relative interest (Google Trends scale is 0–100).
    pub score: f64,
}

/// A time series of search interest for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub keyword: String,
    pub points: Vec<TrendPoint>,
}

/// Growth figures derived from a [`TrendSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub keyword: String,
    pub begin_value: f64,
    pub end_value: f64,
    /// Elapsed months between the first and last sample.
    pub months: f64,
    /// Compound annual growth rate, `None` when undefined.
    pub cagr: Option<f64>,
    /// Compound monthly growth rate, `None` when undefined.
    pub cmgr: Option<f64>,
}

/// Mean Gregorian month length.
const DAYS_PER_MONTH: f64 = 30.436875;

/// CAGR = (end / begin)^(1 / years) − 1.
pub fn compound_annual_growth(begin: f64, end: f64, years: f64) -> Option<f64> {
    if begin <= 0.0 || end <= 0.0 || years <= 0.0 {
        return None;
    }
    Some((end / begin).powf(1.0 / years) - 1.0)
}

/// CMGR = (end / begin)^(1 / months) − 1.
pub fn compound_monthly_growth(begin: f64, end: f64, months: f64) -> Option<f64> {
    if begin <= 0.0 || end <= 0.0 || months <= 0.0 {
        return None;
    }
    Some((end / begin).powf(1.0 / months) - 1.0)
}

impl TrendSeries {
    pub fn new(keyword: impl Into<String>, mut points: Vec<TrendPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self {
            keyword: keyword.into(),
            points,
        }
    }

    /// Growth summary over the whole series. Needs at least two samples.
    ///
    /// Rates are computed over elapsed time, so weekly and monthly series
    /// covering the same span agree.
    pub fn summary(&self) -> Option<TrendSummary> {
        if self.points.len() < 2 {
            return None;
        }
        let first = self.points.first()?;
        let last = self.points.last()?;
        let (begin, end) = (first.score, last.score);
        let months = (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0 / DAYS_PER_MONTH;
        Some(TrendSummary {
            keyword: self.keyword.clone(),
            begin_value: begin,
            end_value: end,
            months,
            cagr: compound_annual_growth(begin, end, months / 12.0),
            cmgr: compound_monthly_growth(begin, end, months),
        })
    }
}

/// What a single evidence item carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidencePayload {
    Patent(PatentRecord),
    TrendPoint { keyword: String, point: TrendPoint },
}

/// One unit of fetched data, tagged with where and when it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Name of the adapter that produced it (e.g., "serpapi_patents").
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: EvidencePayload,
}

/// Why a slot carries no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Unavailable,
    RateLimited,
    InvalidQuery,
    TimedOut,
}

impl From<&AdapterError> for UnavailableReason {
    fn from(err: &AdapterError) -> Self {
        match err {
            AdapterError::Unavailable(_) => UnavailableReason::Unavailable,
            AdapterError::RateLimited { .. } => UnavailableReason::RateLimited,
            AdapterError::InvalidQuery(_) => UnavailableReason::InvalidQuery,
        }
    }
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnavailableReason::Unavailable => "source unavailable",
            UnavailableReason::RateLimited => "rate limited",
            UnavailableReason::InvalidQuery => "query rejected",
            UnavailableReason::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// The result of fetching one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvidenceOutcome {
    Available { items: Vec<EvidenceItem> },
    Unavailable { reason: UnavailableReason },
}

/// Evidence for the plan entry at `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSlot {
    pub index: usize,
    pub entry: PlanEntry,
    pub outcome: EvidenceOutcome,
}

impl EvidenceSlot {
    pub fn is_available(&self) -> bool {
        matches!(self.outcome, EvidenceOutcome::Available { .. })
    }

    pub fn items(&self) -> &[EvidenceItem] {
        match &self.outcome {
            EvidenceOutcome::Available { items } => items,
            EvidenceOutcome::Unavailable { .. } => &[],
        }
    }

    /// Patent records in this slot, in source order.
    pub fn patents(&self) -> impl Iterator<Item = &PatentRecord> {
        self.items().iter().filter_map(|i| match &i.payload {
            EvidencePayload::Patent(p) => Some(p),
            EvidencePayload::TrendPoint { .. } => None,
        })
    }

    /// Reassemble the trend series carried by this slot, if any.
    pub fn trend_series(&self) -> Option<TrendSeries> {
        let PlanEntry::TrendFetch { keyword, .. } = &self.entry else {
            return None;
        };
        let points: Vec<TrendPoint> = self
            .items()
            .iter()
            .filter_map(|i| match &i.payload {
                EvidencePayload::TrendPoint { point, .. } => Some(*point),
                EvidencePayload::Patent(_) => None,
            })
            .collect();
        if points.is_empty() {
            return None;
        }
        Some(TrendSeries::new(keyword.clone(), points))
    }
}
