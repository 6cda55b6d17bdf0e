//! Provider router: builds the configured LLM provider.
//!
//! Every supported backend speaks the OpenAI chat-completions dialect, so
//! routing reduces to picking a base URL and a key, then wrapping the result
//! in the retry policy from config.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use windowscout_config::LlmConfig;
use windowscout_core::error::ProviderError;
use windowscout_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryProvider;

/// Build the provider described by `config`.
///
/// Hosted providers need an API key; local ones (ollama, vllm, llama.cpp)
/// do not.
pub fn build_from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));

    let api_key = match (&config.api_key, is_local(&config.provider)) {
        (Some(key), _) => key.clone(),
        (None, true) => config.provider.clone(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (set llm.api_key or WINDOWSCOUT_API_KEY)",
                config.provider
            )));
        }
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    let base: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::with_timeout(
        &config.provider,
        &base_url,
        api_key,
        timeout,
    ));

    info!(
        provider = %config.provider,
        model = %config.model,
        max_retries = config.max_retries,
        "LLM provider configured"
    );

    if config.max_retries == 0 {
        return Ok(base);
    }

    Ok(Arc::new(RetryProvider::new(
        base,
        config.max_retries,
        Duration::from_millis(config.backoff_ms),
    )))
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn hosted_provider_without_key_is_not_configured() {
        let config = LlmConfig::default();
        match build_from_config(&config) {
            Err(ProviderError::NotConfigured(msg)) => assert!(msg.contains("openrouter")),
            Err(other) => panic!("Expected NotConfigured, got: {other:?}"),
            Ok(_) => panic!("Expected NotConfigured, got a provider"),
        }
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn keyed_provider_builds_with_retry_wrapper() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            max_retries: 2,
            ..LlmConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }
}
