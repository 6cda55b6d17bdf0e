//! Deterministic offline adapters.
//!
//! Used when no SerpApi key is configured, and in tests. The same inputs
//! always produce the same records and series.

use async_trait::async_trait;
use chrono::Months;
use std::time::Duration;
use windowscout_core::adapter::{PatentSearch, TrendData};
use windowscout_core::error::AdapterError;
use windowscout_core::evidence::{PatentRecord, TimeRange, TrendPoint, TrendSeries};

/// Stable 64-bit FNV-1a hash, so mock data does not depend on process state.
fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Mock patent search returning up to ten synthetic records per query.
#[derive(Default)]
pub struct MockPatentSearch {
    failure: Option<AdapterError>,
    delay: Option<Duration>,
}

impl MockPatentSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error`.
    pub fn failing(error: AdapterError) -> Self {
        Self {
            failure: Some(error),
            delay: None,
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The records a query maps to.
    pub fn records_for(query: &str, limit: usize) -> Vec<PatentRecord> {
        (0..10usize.min(limit))
            .map(|i| PatentRecord {
                patent_id: format!("US2024{i:04}"),
                title: format!("Smart {query} Patent #{}", i + 1),
                assignee: format!("Company {}", (b'A' + i as u8) as char),
                abstract_text: format!(
                    "A novel approach to {query} technology involving advanced sensing and AI."
                ),
                filing_date: Some(format!("2024-0{}-15", (i % 9) + 1)),
                publication_date: None,
                link: None,
            })
            .collect()
    }
}

#[async_trait]
impl PatentSearch for MockPatentSearch {
    fn name(&self) -> &str {
        "mock-patents"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(AdapterError::InvalidQuery("empty patent query".into()));
        }
        Ok(Self::records_for(query, limit))
    }
}

/// Mock trend source producing one monthly point per window month.
#[derive(Default)]
pub struct MockTrendData {
    failure: Option<AdapterError>,
    delay: Option<Duration>,
}

impl MockTrendData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error`.
    pub fn failing(error: AdapterError) -> Self {
        Self {
            failure: Some(error),
            delay: None,
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The series a keyword maps to over `window`.
    pub fn series_for(keyword: &str, window: &TimeRange) -> TrendSeries {
        let hash = fnv1a(keyword);
        let base = 10.0 + (hash % 41) as f64;
        let slope = 0.5 + ((hash >> 8) % 16) as f64 / 10.0;

        let points = (0..window.months())
            .filter_map(|m| {
                let timestamp = window.start.checked_add_months(Months::new(m))?;
                let wobble = ((u64::from(m) * 7 + hash) % 5) as f64 - 2.0;
                let score = (base + f64::from(m) * slope + wobble).clamp(0.0, 100.0);
                Some(TrendPoint {
                    timestamp,
                    score: (score * 10.0).round() / 10.0,
                })
            })
            .collect();

        TrendSeries::new(keyword, points)
    }
}

#[async_trait]
impl TrendData for MockTrendData {
    fn name(&self) -> &str {
        "mock-trends"
    }

    async fn fetch(&self, keyword: &str, window: &TimeRange) -> Result<TrendSeries, AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AdapterError::InvalidQuery("empty trend keyword".into()));
        }
        Ok(Self::series_for(keyword, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeRange {
        TimeRange::trailing_months(36, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn patents_respect_limit_and_are_stable() {
        let search = MockPatentSearch::new();
        let a = search.search("water bottle", 3).await.unwrap();
        let b = search.search("water bottle", 3).await.unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a, b);
        assert_eq!(a[0].title, "Smart water bottle Patent #1");
        assert_eq!(a[1].assignee, "Company B");
    }

    #[tokio::test]
    async fn patents_cap_at_ten() {
        let records = MockPatentSearch::new().search("x", 50).await.unwrap();
        assert_eq!(records.len(), 10);
    }

    #[tokio::test]
    async fn trend_series_covers_window_deterministically() {
        let trends = MockTrendData::new();
        let a = trends.fetch("smart bottle", &window()).await.unwrap();
        let b = trends.fetch("smart bottle", &window()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.points.len(), 36);
        assert!(a.points.iter().all(|p| window().contains(p.timestamp)));
        assert!(a.points.iter().all(|p| (0.0..=100.0).contains(&p.score)));
        assert!(a.summary().is_some());
    }

    #[tokio::test]
    async fn different_keywords_differ() {
        let trends = MockTrendData::new();
        let a = trends.fetch("alpha", &window()).await.unwrap();
        let b = trends.fetch("omega", &window()).await.unwrap();
        assert_ne!(a.points, b.points);
    }

    #[tokio::test]
    async fn failing_mock_returns_its_error() {
        let trends = MockTrendData::failing(AdapterError::RateLimited { retry_after_secs: 9 });
        let err = trends.fetch("x", &window()).await.unwrap_err();
        assert_eq!(err, AdapterError::RateLimited { retry_after_secs: 9 });
    }
}
