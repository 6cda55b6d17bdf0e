//! SerpApi adapters: Google Patents search and Google Trends time series.
//!
//! Response parsing is split into pure functions so it can be tested against
//! recorded JSON without the network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};
use windowscout_core::adapter::{PatentSearch, TrendData};
use windowscout_core::error::AdapterError;
use windowscout_core::evidence::{PatentRecord, TimeRange, TrendPoint, TrendSeries};

use crate::http::{RetryPolicy, get_json_with_retry};

/// SerpApi caps `num` for google_patents at 100.
const MAX_PAGE_SIZE: usize = 100;

/// SerpApi answers "no results" as an error string with status 200.
fn is_empty_result_error(message: &str) -> bool {
    message.contains("hasn't returned any results")
}

/// Common connection settings.
#[derive(Clone)]
struct SerpApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
}

impl SerpApiClient {
    async fn search(&self, mut params: Vec<(&str, String)>) -> Result<Value, AdapterError> {
        params.push(("api_key", self.api_key.clone()));
        get_json_with_retry(&self.client, &self.base_url, &params, self.policy).await
    }
}

/// Google Patents search through SerpApi.
pub struct SerpApiPatents {
    inner: SerpApiClient,
    countries: Vec<String>,
}

impl SerpApiPatents {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: SerpApiClient {
                client,
                base_url: base_url.into(),
                api_key: api_key.into(),
                policy,
            },
            countries: Vec::new(),
        }
    }

    /// Restrict results to these country codes (e.g. "US", "CN", "WO").
    pub fn with_countries(mut self, countries: Vec<String>) -> Self {
        self.countries = countries;
        self
    }

    /// Query parameters for one page. Pages are 1-indexed.
    fn page_params(&self, query: &str, page: usize, page_size: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("engine", "google_patents".to_string()),
            ("q", query.to_string()),
            ("num", page_size.to_string()),
            ("page", page.to_string()),
        ];
        if !self.countries.is_empty() {
            params.push(("country", self.countries.join(",")));
        }
        params
    }
}

/// One parsed page of google_patents results.
#[derive(Debug, Default)]
pub struct PatentPage {
    pub records: Vec<PatentRecord>,
    /// Number of raw organic results on the page
    pub raw_count: usize,
    pub has_next: bool,
}

/// Parse a google_patents response body.
pub fn parse_patent_page(body: &Value) -> Result<PatentPage, AdapterError> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        if is_empty_result_error(message) {
            return Ok(PatentPage::default());
        }
        return Err(AdapterError::Unavailable(format!("serpapi: {message}")));
    }

    let organic = body
        .get("organic_results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let records = organic.iter().filter_map(parse_patent).collect();

    let has_next = body
        .get("serpapi_pagination")
        .and_then(|p| p.get("next"))
        .is_some_and(|n| !n.is_null());

    Ok(PatentPage {
        records,
        raw_count: organic.len(),
        has_next,
    })
}

fn parse_patent(item: &Value) -> Option<PatentRecord> {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let title = text("title")?;

    Some(PatentRecord {
        patent_id: text("publication_number")
            .or_else(|| text("patent_id").map(|id| id.trim_start_matches("patent/").trim_end_matches("/en").to_string()))
            .unwrap_or_default(),
        title,
        assignee: text("assignee").unwrap_or_default(),
        abstract_text: text("snippet").unwrap_or_default(),
        filing_date: text("filing_date"),
        publication_date: text("publication_date"),
        link: text("patent_link").or_else(|| text("pdf")),
    })
}

#[async_trait]
impl PatentSearch for SerpApiPatents {
    fn name(&self) -> &str {
        "serpapi-patents"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, AdapterError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdapterError::InvalidQuery("empty patent query".into()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let page_size = limit.min(MAX_PAGE_SIZE);
        let mut records: Vec<PatentRecord> = Vec::new();
        let mut page = 1;

        while records.len() < limit {
            let body = self.inner.search(self.page_params(query, page, page_size)).await?;
            let parsed = parse_patent_page(&body)?;
            debug!(query, page, results = parsed.raw_count, "google_patents page");

            if parsed.raw_count == 0 {
                break;
            }

            let remaining = limit - records.len();
            records.extend(parsed.records.into_iter().take(remaining));

            if parsed.raw_count < page_size || !parsed.has_next {
                break;
            }
            page += 1;
        }

        info!(query, count = records.len(), countries = ?self.countries, "SerpApi patents fetched");
        Ok(records)
    }
}

/// Google Trends interest-over-time through SerpApi.
pub struct SerpApiTrends {
    inner: SerpApiClient,
}

impl SerpApiTrends {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: SerpApiClient {
                client,
                base_url: base_url.into(),
                api_key: api_key.into(),
                policy,
            },
        }
    }

    fn params(keyword: &str, window: &TimeRange) -> Vec<(&'static str, String)> {
        vec![
            ("engine", "google_trends".to_string()),
            ("q", keyword.to_string()),
            ("data_type", "TIMESERIES".to_string()),
            (
                "date",
                format!(
                    "{} {}",
                    window.start.format("%Y-%m-%d"),
                    window.end.format("%Y-%m-%d")
                ),
            ),
        ]
    }
}

/// Parse a google_trends TIMESERIES body into points inside `window`.
pub fn parse_trend_points(body: &Value, window: &TimeRange) -> Result<Vec<TrendPoint>, AdapterError> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        if is_empty_result_error(message) {
            return Ok(Vec::new());
        }
        return Err(AdapterError::Unavailable(format!("serpapi: {message}")));
    }

    let timeline = body
        .get("interest_over_time")
        .and_then(|i| i.get("timeline_data"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let points = timeline
        .iter()
        .filter_map(|entry| {
            let timestamp = entry
                .get("timestamp")
                .and_then(|t| match t {
                    Value::String(s) => s.parse::<i64>().ok(),
                    other => other.as_i64(),
                })
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))?;
            let score = entry
                .get("values")
                .and_then(Value::as_array)
                .and_then(|values| values.first())
                .and_then(|v| v.get("extracted_value"))
                .and_then(Value::as_f64)?;
            Some(TrendPoint { timestamp, score })
        })
        .filter(|p| window.contains(p.timestamp))
        .collect();

    Ok(points)
}

#[async_trait]
impl TrendData for SerpApiTrends {
    fn name(&self) -> &str {
        "serpapi-trends"
    }

    async fn fetch(&self, keyword: &str, window: &TimeRange) -> Result<TrendSeries, AdapterError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AdapterError::InvalidQuery("empty trend keyword".into()));
        }
        if window.start >= window.end {
            return Err(AdapterError::InvalidQuery("trend window is empty".into()));
        }

        let body = self.inner.search(Self::params(keyword, window)).await?;
        let points = parse_trend_points(&body, window)?;

        info!(keyword, points = points.len(), "SerpApi trend series fetched");
        Ok(TrendSeries::new(keyword, points))
    }
}
