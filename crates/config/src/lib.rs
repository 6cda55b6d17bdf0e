//! Configuration loading, validation, and management for WindowScout.
//!
//! Loads configuration from `~/.windowscout/config.toml` with environment
//! variable overrides. Validates all settings at startup. A session takes a
//! snapshot of the values it needs when it starts and never re-reads them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.windowscout/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM completion provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Patent and trend data sources
    #[serde(default)]
    pub data_sources: DataSourcesConfig,

    /// Workflow behavior
    #[serde(default)]
    pub agent: AgentConfig,

    /// Long-term memory and retention
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Where finished sessions are archived
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "openrouter", "openai", "ollama", "deepseek", or any
    /// OpenAI-compatible name paired with `api_url`
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request HTTP timeout
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after the first one for retryable failures
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// Initial backoff between attempts; doubles each retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_llm_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_llm_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    500
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_model(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DataSourcesConfig {
    /// "serpapi", "uspto" or "mock"
    #[serde(default = "default_patent_provider")]
    pub patent_provider: String,

    /// "serpapi" or "mock"
    #[serde(default = "default_trend_provider")]
    pub trend_provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serpapi_api_key: Option<String>,

    /// Override the SerpApi endpoint (testing, proxies)
    #[serde(default = "default_serpapi_url")]
    pub serpapi_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uspto_api_key: Option<String>,

    /// Override the USPTO publications endpoint
    #[serde(default = "default_uspto_url")]
    pub uspto_url: String,

    /// Restrict patent results to these country codes (empty = any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patent_countries: Vec<String>,

    /// Extra attempts after the first one for retryable source failures
    #[serde(default = "default_source_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_patent_provider() -> String {
    "serpapi".into()
}
fn default_trend_provider() -> String {
    "serpapi".into()
}
fn default_serpapi_url() -> String {
    "https://serpapi.com/search.json".into()
}
fn default_uspto_url() -> String {
    "https://developer.uspto.gov/ibd-api/v1/application/publications".into()
}
fn default_source_retries() -> u32 {
    1
}

impl Default for DataSourcesConfig {
    fn default() -> Self {
        Self {
            patent_provider: default_patent_provider(),
            trend_provider: default_trend_provider(),
            serpapi_api_key: None,
            serpapi_url: default_serpapi_url(),
            uspto_api_key: None,
            uspto_url: default_uspto_url(),
            patent_countries: Vec::new(),
            max_retries: default_source_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl std::fmt::Debug for DataSourcesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourcesConfig")
            .field("patent_provider", &self.patent_provider)
            .field("trend_provider", &self.trend_provider)
            .field("serpapi_api_key", &redact(&self.serpapi_api_key))
            .field("serpapi_url", &self.serpapi_url)
            .field("uspto_api_key", &redact(&self.uspto_api_key))
            .field("uspto_url", &self.uspto_url)
            .field("patent_countries", &self.patent_countries)
            .field("max_retries", &self.max_retries)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Ceiling on synthesis attempts per session
    #[serde(default = "default_max_review_iterations")]
    pub max_review_iterations: u32,

    /// Records requested per patent search
    #[serde(default = "default_patent_search_limit")]
    pub patent_search_limit: usize,

    /// Trend window length
    #[serde(default = "default_trend_timeframe_months")]
    pub trend_timeframe_months: u32,

    /// How many plan keywords get a patent search
    #[serde(default = "default_max_patent_keywords")]
    pub max_patent_keywords: usize,

    /// How many plan keywords get a trend fetch
    #[serde(default = "default_max_trend_keywords")]
    pub max_trend_keywords: usize,

    /// Deadline for each individual source call
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// "rules" (deterministic checklist) or "llm"
    #[serde(default = "default_review_gate")]
    pub review_gate: String,

    /// Ask the LLM for a patent landscape analysis before synthesis
    #[serde(default = "default_true")]
    pub patent_analysis: bool,
}

fn default_max_review_iterations() -> u32 {
    3
}
fn default_patent_search_limit() -> usize {
    50
}
fn default_trend_timeframe_months() -> u32 {
    36
}
fn default_max_patent_keywords() -> usize {
    3
}
fn default_max_trend_keywords() -> usize {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_review_gate() -> String {
    "rules".into()
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_review_iterations: default_max_review_iterations(),
            patent_search_limit: default_patent_search_limit(),
            trend_timeframe_months: default_trend_timeframe_months(),
            max_patent_keywords: default_max_patent_keywords(),
            max_trend_keywords: default_max_trend_keywords(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            review_gate: default_review_gate(),
            patent_analysis: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "file", "in_memory", or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// JSONL path for the file backend (default: ~/.windowscout/memory/memories.jsonl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Entries younger than this are recalled verbatim
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,

    /// Entries at least this old are recalled as short summaries
    #[serde(default = "default_short_summary_after_days")]
    pub short_summary_after_days: u32,

    /// Entries at least this old are expired
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Below this importance, non-recent entries drop to the short summary
    #[serde(default = "default_low_importance_threshold")]
    pub low_importance_threshold: f32,

    #[serde(default = "default_long_summary_max_chars")]
    pub long_summary_max_chars: usize,

    #[serde(default = "default_short_summary_max_chars")]
    pub short_summary_max_chars: usize,

    /// Upper bound on stored entry length
    #[serde(default = "default_max_entry_chars")]
    pub max_entry_chars: usize,

    /// Memories recalled into the planning prompt
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_memory_backend() -> String {
    "file".into()
}
fn default_recent_days() -> u32 {
    7
}
fn default_short_summary_after_days() -> u32 {
    30
}
fn default_retention_days() -> u32 {
    90
}
fn default_low_importance_threshold() -> f32 {
    0.3
}
fn default_long_summary_max_chars() -> usize {
    500
}
fn default_short_summary_max_chars() -> usize {
    100
}
fn default_max_entry_chars() -> usize {
    2000
}
fn default_recall_limit() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
            recent_days: default_recent_days(),
            short_summary_after_days: default_short_summary_after_days(),
            retention_days: default_retention_days(),
            low_importance_threshold: default_low_importance_threshold(),
            long_summary_max_chars: default_long_summary_max_chars(),
            short_summary_max_chars: default_short_summary_max_chars(),
            max_entry_chars: default_max_entry_chars(),
            recall_limit: default_recall_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory for archived session outcomes (default: ~/.windowscout/reports)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.windowscout/config.toml).
    ///
    /// Also checks environment variables:
    /// - `WINDOWSCOUT_API_KEY`, `OPENROUTER_API_KEY`, `OPENAI_API_KEY` (LLM key, first wins)
    /// - `SERPAPI_API_KEY`, `USPTO_API_KEY`
    /// - `WINDOWSCOUT_PROVIDER`, `WINDOWSCOUT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("WINDOWSCOUT_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }
        if self.data_sources.serpapi_api_key.is_none() {
            self.data_sources.serpapi_api_key = lookup("SERPAPI_API_KEY");
        }
        if self.data_sources.uspto_api_key.is_none() {
            self.data_sources.uspto_api_key = lookup("USPTO_API_KEY");
        }
        if let Some(provider) = lookup("WINDOWSCOUT_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("WINDOWSCOUT_MODEL") {
            self.llm.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".windowscout")
    }

    /// Memory file path, honoring the configured override.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("memory").join("memories.jsonl"))
    }

    /// Archive directory, honoring the configured override.
    pub fn archive_dir(&self) -> PathBuf {
        self.archive
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("reports"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_review_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_review_iterations must be at least 1".into(),
            ));
        }

        if self.agent.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.fetch_timeout_secs must be at least 1".into(),
            ));
        }

        if self.agent.max_patent_keywords == 0 && self.agent.max_trend_keywords == 0 {
            return Err(ConfigError::ValidationError(
                "at least one of agent.max_patent_keywords / max_trend_keywords must be > 0".into(),
            ));
        }

        if !matches!(self.agent.review_gate.as_str(), "rules" | "llm") {
            return Err(ConfigError::ValidationError(format!(
                "agent.review_gate must be \"rules\" or \"llm\", got \"{}\"",
                self.agent.review_gate
            )));
        }

        let patents = &self.data_sources.patent_provider;
        if !matches!(patents.as_str(), "serpapi" | "uspto" | "mock") {
            return Err(ConfigError::ValidationError(format!(
                "data_sources.patent_provider must be \"serpapi\", \"uspto\" or \"mock\", got \"{patents}\""
            )));
        }

        let trends = &self.data_sources.trend_provider;
        if !matches!(trends.as_str(), "serpapi" | "mock") {
            return Err(ConfigError::ValidationError(format!(
                "data_sources.trend_provider must be \"serpapi\" or \"mock\", got \"{trends}\""
            )));
        }

        if !matches!(self.memory.backend.as_str(), "file" | "in_memory" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be \"file\", \"in_memory\" or \"none\", got \"{}\"",
                self.memory.backend
            )));
        }

        let m = &self.memory;
        if m.recent_days == 0
            || m.recent_days > m.short_summary_after_days
            || m.short_summary_after_days > m.retention_days
        {
            return Err(ConfigError::ValidationError(
                "memory thresholds must satisfy 0 < recent_days <= short_summary_after_days <= retention_days"
                    .into(),
            ));
        }

        if !(0.0..=1.0).contains(&m.low_importance_threshold) {
            return Err(ConfigError::ValidationError(
                "memory.low_importance_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if m.short_summary_max_chars == 0 || m.short_summary_max_chars > m.long_summary_max_chars {
            return Err(ConfigError::ValidationError(
                "memory summary limits must satisfy 0 < short_summary_max_chars <= long_summary_max_chars"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// A copy with every secret replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some("[REDACTED]".into());
        }
        if copy.data_sources.serpapi_api_key.is_some() {
            copy.data_sources.serpapi_api_key = Some("[REDACTED]".into());
        }
        if copy.data_sources.uspto_api_key.is_some() {
            copy.data_sources.uspto_api_key = Some("[REDACTED]".into());
        }
        copy
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
