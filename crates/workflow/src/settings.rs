//! The per-session settings snapshot.

use std::time::Duration;
use windowscout_config::AppConfig;

/// Values a session reads from configuration, captured once at session
/// start so a config reload never changes a running session.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_review_iterations: u32,
    pub patent_search_limit: usize,
    pub trend_timeframe_months: u32,
    pub max_patent_keywords: usize,
    pub max_trend_keywords: usize,
    pub fetch_timeout: Duration,
    pub patent_analysis: bool,
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_review_iterations: config.agent.max_review_iterations.max(1),
            patent_search_limit: config.agent.patent_search_limit,
            trend_timeframe_months: config.agent.trend_timeframe_months,
            max_patent_keywords: config.agent.max_patent_keywords,
            max_trend_keywords: config.agent.max_trend_keywords,
            fetch_timeout: Duration::from_secs(config.agent.fetch_timeout_secs),
            patent_analysis: config.agent.patent_analysis,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config() {
        let s = WorkflowSettings::default();
        assert_eq!(s.max_review_iterations, 3);
        assert_eq!(s.patent_search_limit, 50);
        assert_eq!(s.trend_timeframe_months, 36);
        assert_eq!(s.max_patent_keywords, 3);
        assert_eq!(s.fetch_timeout, Duration::from_secs(30));
        assert!(s.patent_analysis);
    }

    #[test]
    fn snapshot_is_independent_of_later_changes() {
        let mut config = AppConfig::default();
        let snapshot = WorkflowSettings::from_config(&config);
        config.agent.max_review_iterations = 7;
        assert_eq!(snapshot.max_review_iterations, 3);
    }
}
