//! Data source traits: patent search and search-trend providers.
//!
//! Each trait exposes one idempotent request/response operation. Concrete
//! backends (SerpApi, offline mocks) live in `windowscout-sources` and are
//! selected by configuration at session start.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::evidence::{PatentRecord, TimeRange, TrendSeries};

/// Searches a patent database.
#[async_trait]
pub trait PatentSearch: Send + Sync {
    /// Source name recorded on every evidence item (e.g., "serpapi_patents").
    fn name(&self) -> &str;

    /// Return at most `limit` records, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, AdapterError>;
}

/// Fetches search-interest time series.
#[async_trait]
pub trait TrendData: Send + Sync {
    /// Source name recorded on every evidence item (e.g., "serpapi_trends").
    fn name(&self) -> &str;

    /// Return the interest series for `keyword` within `window`.
    async fn fetch(&self, keyword: &str, window: &TimeRange) -> Result<TrendSeries, AdapterError>;
}
