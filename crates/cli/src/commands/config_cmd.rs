//! `windowscout config`: Configuration management commands.

use anyhow::Context;
use std::path::Path;
use tracing::info;
use windowscout_config::AppConfig;

use super::config_file;

pub fn init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = config_file(path);
    if target.exists() && !force {
        println!("⚠️  Config already exists at {}", target.display());
        println!("   Run with --force to overwrite.");
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!(path = %target.display(), overwrite = force, "Default config written");
    println!("✅ Wrote default config to {}", target.display());
    println!("   Set OPENROUTER_API_KEY and SERPAPI_API_KEY, or add keys to the file.");
    Ok(())
}

pub fn show(config: &AppConfig) -> anyhow::Result<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        init(Some(&path), false).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.max_review_iterations, 3);
    }

    #[test]
    fn init_keeps_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_review_iterations = 5\n").unwrap();
        init(Some(&path), false).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("= 5"));
        init(Some(&path), true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("max_review_iterations = 3"));
    }
}
