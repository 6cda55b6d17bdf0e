//! `windowscout memory`: Inspect the tiered long-term memory.

use chrono::Utc;
use tracing::info;
use windowscout_config::AppConfig;
use windowscout_memory::{RecalledMemory, build_service};

const PREVIEW_CHARS: usize = 80;

pub async fn list(config: &AppConfig) -> anyhow::Result<()> {
    let service = build_service(config);
    let now = Utc::now();
    let entries = service.inventory(now).await?;

    println!("🧠 Memory ({} backend)", service.store_name());
    println!("====================");
    if entries.is_empty() {
        println!("  No memories stored yet.");
        return Ok(());
    }
    for m in &entries {
        println!("{}", render(m, now));
    }
    println!();
    let policy = service.policy();
    println!(
        "  Tiers: raw < {}d, short summary from {}d, expired at {}d",
        policy.recent_days, policy.short_summary_after_days, policy.retention_days
    );
    Ok(())
}

pub async fn search(config: &AppConfig, text: &str, limit: usize) -> anyhow::Result<()> {
    let service = build_service(config).with_recall_limit(limit);
    let now = Utc::now();

    println!("🔍 What a session about \"{text}\" would recall:");
    println!();
    let recalled = service.recall(text, now).await?;
    if recalled.is_empty() {
        println!("   Nothing to recall.");
    }
    for m in &recalled {
        println!("{}", render(m, now));
    }
    Ok(())
}

pub async fn purge(config: &AppConfig) -> anyhow::Result<()> {
    let service = build_service(config);
    let removed = service.purge_expired(Utc::now()).await?;
    info!(backend = service.store_name(), removed, "Expired memories purged");
    println!(
        "🗑️  Purged {removed} expired memories (older than {} days).",
        service.policy().retention_days
    );
    Ok(())
}

/// One line per entry: age, tier, importance, and the compressed view.
pub fn render(m: &RecalledMemory, now: chrono::DateTime<Utc>) -> String {
    let view = match &m.content {
        Some(content) => {
            let flat = content.replace('\n', " ");
            if flat.chars().count() > PREVIEW_CHARS {
                format!("{}...", flat.chars().take(PREVIEW_CHARS).collect::<String>())
            } else {
                flat
            }
        }
        None => "(expired)".to_string(),
    };
    format!(
        "  {:>4}d  {:<13}  {:.2}  {}",
        m.entry.age_days(now),
        m.tier.to_string(),
        m.entry.importance,
        view
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use windowscout_core::memory::{MemoryEntry, MemoryTier};

    #[test]
    fn render_marks_expired_entries() {
        let now = Utc::now();
        let mut entry = MemoryEntry::new("old news");
        entry.created_at = now - chrono::Duration::days(120);
        let line = render(
            &RecalledMemory {
                entry,
                tier: MemoryTier::Expired,
                content: None,
            },
            now,
        );
        assert!(line.contains("120d"));
        assert!(line.contains("expired"));
        assert!(!line.contains("old news"));
    }

    #[test]
    fn render_truncates_long_views() {
        let now = Utc::now();
        let line = render(
            &RecalledMemory {
                entry: MemoryEntry::new("x"),
                tier: MemoryTier::Raw,
                content: Some("y".repeat(200)),
            },
            now,
        );
        assert!(line.ends_with(&format!("{}...", "y".repeat(PREVIEW_CHARS))));
    }
}
