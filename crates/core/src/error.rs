//! Error types for the WindowScout domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; workflow-level errors
//! (planning, synthesis) live next to the orchestrator.

use thiserror::Error;

/// The top-level error type for WindowScout operations outside the workflow.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Data source errors ---
    #[error("Data source error: {0}")]
    Adapter(#[from] AdapterError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the LLM completion provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Response blocked by content filter: {0}")]
    ContentFiltered(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }

    /// A short, human-readable cause that never includes the provider's raw
    /// response body.
    pub fn public_cause(&self) -> &'static str {
        match self {
            ProviderError::ContentFiltered(_) => "language model refused the request (content filter)",
            ProviderError::RateLimited { .. } => "language model is rate limiting requests",
            ProviderError::AuthenticationFailed(_) => "language model rejected the configured credentials",
            ProviderError::NotConfigured(_) => "language model provider is not configured",
            ProviderError::ApiError { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => "language model is unavailable",
        }
    }
}

/// Failures of the patent search and trend data adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited by source, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Failures of the long-term memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}
