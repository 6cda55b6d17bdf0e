//! Shared HTTP plumbing for data-source adapters.
//!
//! Maps transport and status failures onto [`AdapterError`] and retries the
//! transient ones with exponential backoff.

use std::time::Duration;
use tracing::{debug, warn};
use windowscout_core::error::AdapterError;

/// Retry policy for source requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, retry: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(retry))
            .min(Duration::from_secs(10))
    }
}

/// Build the client every adapter shares.
pub fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("windowscout/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Like [`client`], but sends `name: value` with every request.
pub fn client_with_header(
    timeout: Duration,
    name: &'static str,
    value: &str,
) -> Result<reqwest::Client, AdapterError> {
    let mut value = reqwest::header::HeaderValue::from_str(value)
        .map_err(|_| AdapterError::InvalidQuery(format!("{name} is not a valid header value")))?;
    value.set_sensitive(true);
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(name, value);
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("windowscout/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
        .map_err(|e| AdapterError::Unavailable(format!("cannot build HTTP client: {e}")))
}

/// Map an HTTP status to an adapter error. `None` means success.
pub fn status_error(status: u16, retry_after_secs: Option<u64>) -> Option<AdapterError> {
    match status {
        200..=299 => None,
        429 => Some(AdapterError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(5),
        }),
        400 | 404 | 422 => Some(AdapterError::InvalidQuery(format!(
            "source rejected the query (status {status})"
        ))),
        _ => Some(AdapterError::Unavailable(format!(
            "source returned status {status}"
        ))),
    }
}

fn is_retryable(err: &AdapterError) -> bool {
    !matches!(err, AdapterError::InvalidQuery(_))
}

/// GET `url` with `params`, returning the decoded JSON body.
pub async fn get_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
    policy: RetryPolicy,
) -> Result<serde_json::Value, AdapterError> {
    let mut retry = 0;
    loop {
        match get_json(client, url, params).await {
            Ok(body) => return Ok(body),
            Err(e) if is_retryable(&e) && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                warn!(url, error = %e, attempt = retry + 1, "Source request failed, retrying");
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn get_json(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<serde_json::Value, AdapterError> {
    debug!(url, "Source request");

    let response = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("request failed: {e}")))?;

    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    if let Some(err) = status_error(status, retry_after) {
        return Err(err);
    }

    response
        .json()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("malformed response body: {e}")))
}
