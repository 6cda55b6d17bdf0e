//! Provider retry: bounded re-attempts with exponential backoff.
//!
//! Wraps any provider. Retryable failures (rate limits, timeouts, network
//! errors, 5xx) are attempted again; everything else is returned at once.
//! The workflow only ever sees the final outcome.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use windowscout_core::error::ProviderError;
use windowscout_core::provider::*;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A provider that retries a wrapped provider on transient failures.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    max_retries: u32,
    backoff: Duration,
    attempt_timeout: Option<Duration>,
}

impl RetryProvider {
    /// `max_retries` extra attempts after the first; backoff doubles each time.
    pub fn new(inner: Arc<dyn Provider>, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
            attempt_timeout: None,
        }
    }

    /// Bound every individual attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Sleep before retry number `retry` (0-based), honoring a rate limit hint.
    fn delay_for(&self, retry: u32, error: &ProviderError) -> Duration {
        let exponential = self.backoff.saturating_mul(2u32.saturating_pow(retry));
        let hinted = match error {
            ProviderError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).max(exponential)
            }
            _ => exponential,
        };
        hinted.min(MAX_BACKOFF)
    }

    async fn attempt(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.inner.name(),
                    limit.as_secs()
                ))),
            },
            None => self.inner.complete(request).await,
        }
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut retry = 0;
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        info!(provider = %self.name(), retries = retry, "Provider recovered after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(retry, &e);
                    warn!(
                        provider = %self.name(),
                        error = %e,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
