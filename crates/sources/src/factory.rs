//! Build the configured data sources.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use windowscout_config::DataSourcesConfig;
use windowscout_core::Error;
use windowscout_core::adapter::{PatentSearch, TrendData};

use crate::http::{self, RetryPolicy};
use crate::mock::{MockPatentSearch, MockTrendData};
use crate::serpapi::{SerpApiPatents, SerpApiTrends};
use crate::uspto::{self, UsptoPatents};

fn retry_policy(config: &DataSourcesConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        backoff: Duration::from_millis(config.backoff_ms),
    }
}

/// A non-blank key, or `None` with a warning when the source must fall back.
fn usable_key<'a>(key: Option<&'a str>, service: &str, what: &str) -> Option<&'a str> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Some(key),
        _ => {
            warn!(service, source = what, "API key not configured, using mock data");
            None
        }
    }
}

fn serpapi_key<'a>(config: &'a DataSourcesConfig, what: &str) -> Option<&'a str> {
    usable_key(config.serpapi_api_key.as_deref(), "serpapi", what)
}

/// Build the patent search adapter named by `data_sources.patent_provider`.
pub fn build_patent_search(
    config: &DataSourcesConfig,
    timeout: Duration,
) -> Result<Arc<dyn PatentSearch>, Error> {
    let search: Arc<dyn PatentSearch> = match config.patent_provider.as_str() {
        "mock" => Arc::new(MockPatentSearch::new()),
        "serpapi" => match serpapi_key(config, "patents") {
            Some(key) => Arc::new(
                SerpApiPatents::new(
                    http::client(timeout),
                    &config.serpapi_url,
                    key,
                    retry_policy(config),
                )
                .with_countries(config.patent_countries.clone()),
            ),
            None => Arc::new(MockPatentSearch::new()),
        },
        "uspto" => match usable_key(config.uspto_api_key.as_deref(), "uspto", "patents") {
            Some(key) => {
                let client = http::client_with_header(timeout, uspto::API_KEY_HEADER, key)
                    .map_err(|e| Error::Config {
                        message: format!("uspto_api_key: {e}"),
                    })?;
                Arc::new(UsptoPatents::new(client, &config.uspto_url, retry_policy(config)))
            }
            None => Arc::new(MockPatentSearch::new()),
        },
        other => {
            return Err(Error::Config {
                message: format!("unsupported patent provider: {other}"),
            });
        }
    };
    info!(source = search.name(), "Patent search configured");
    Ok(search)
}

/// Build the trend adapter named by `data_sources.trend_provider`.
pub fn build_trend_data(
    config: &DataSourcesConfig,
    timeout: Duration,
) -> Result<Arc<dyn TrendData>, Error> {
    let trends: Arc<dyn TrendData> = match config.trend_provider.as_str() {
        "mock" => Arc::new(MockTrendData::new()),
        "serpapi" => match serpapi_key(config, "trends") {
            Some(key) => Arc::new(SerpApiTrends::new(
                http::client(timeout),
                &config.serpapi_url,
                key,
                retry_policy(config),
            )),
            None => Arc::new(MockTrendData::new()),
        },
        other => {
            return Err(Error::Config {
                message: format!("unsupported trend provider: {other}"),
            });
        }
    };
    info!(source = trends.name(), "Trend data configured");
    Ok(trends)
}
