//! `windowscout status`: Show system status.

use anyhow::Context;
use std::path::Path;
use tracing::debug;
use windowscout_config::AppConfig;
use windowscout_core::provider::Provider;

use super::config_file;

pub async fn run(config: &AppConfig, path: Option<&Path>, check: bool) -> anyhow::Result<()> {
    let key_state = |key: &Option<String>| if key.is_some() { "key set" } else { "no key, mock data" };
    let sources = &config.data_sources;
    let patent_key = match sources.patent_provider.as_str() {
        "uspto" => key_state(&sources.uspto_api_key),
        "mock" => "offline",
        _ => key_state(&sources.serpapi_api_key),
    };
    let trend_key = match sources.trend_provider.as_str() {
        "mock" => "offline",
        _ => key_state(&sources.serpapi_api_key),
    };
    let m = &config.memory;

    println!("🔭 WindowScout Status");
    println!("==================");
    println!("  Config file:  {}", config_file(path).display());
    println!("  LLM:          {} / {}", config.llm.provider, config.llm.model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Patents:      {} ({patent_key})", sources.patent_provider);
    println!("  Trends:       {} ({trend_key})", sources.trend_provider);
    println!("  Review gate:  {} (max {} iterations)", config.agent.review_gate, config.agent.max_review_iterations);
    println!("  Fetch limit:  {}s per source", config.agent.fetch_timeout_secs);
    println!("  Memory:       {} ({})", m.backend, config.memory_path().display());
    println!(
        "  Retention:    raw < {}d, long summary < {}d, expired at {}d (low importance < {})",
        m.recent_days, m.short_summary_after_days, m.retention_days, m.low_importance_threshold
    );
    println!("  Reports:      {}", config.archive_dir().display());

    if check {
        let provider = windowscout_providers::build_from_config(&config.llm)
            .context("Failed to configure the LLM provider")?;
        println!("  LLM check:    {}", llm_health(provider.as_ref()).await);
    }

    if config_file(path).exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `windowscout config init` first");
    }
    Ok(())
}

/// Ask the provider whether it is reachable and describe the answer.
pub async fn llm_health(provider: &dyn Provider) -> String {
    let result = provider.health_check().await;
    debug!(provider = provider.name(), ok = ?result.as_ref().ok(), "LLM health check");
    match result {
        Ok(true) => format!("✅ {} reachable", provider.name()),
        Ok(false) => format!("⚠️  {} answered but rejected the request", provider.name()),
        Err(e) => format!("❌ {} unreachable: {e}", provider.name()),
    }
}
