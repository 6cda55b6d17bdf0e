//! Memory service: retention-aware recall and append-only writes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use windowscout_core::error::MemoryError;
use windowscout_core::memory::{MemoryEntry, MemoryQuery, MemoryStore, MemoryTier};

use crate::retention::RetentionPolicy;

/// A memory as seen at recall time: the stored entry plus its current tier
/// and compressed view.
#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    pub entry: MemoryEntry,
    pub tier: MemoryTier,
    /// The compressed view; `None` only for expired entries.
    pub content: Option<String>,
}

/// Wraps a [`MemoryStore`] with the retention policy.
pub struct MemoryService {
    store: Arc<dyn MemoryStore>,
    policy: RetentionPolicy,
    recall_limit: usize,
    max_entry_chars: usize,
}

impl MemoryService {
    pub fn new(store: Arc<dyn MemoryStore>, policy: RetentionPolicy) -> Self {
        Self {
            store,
            policy,
            recall_limit: 10,
            max_entry_chars: 2000,
        }
    }

    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    pub fn with_max_entry_chars(mut self, max: usize) -> Self {
        self.max_entry_chars = max;
        self
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Memories relevant to `context`, compressed for their age at `now`.
    /// Expired entries are never returned.
    pub async fn recall(
        &self,
        context: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecalledMemory>, MemoryError> {
        let query = MemoryQuery::new(context)
            .with_limit(self.recall_limit)
            .not_before(self.policy.expiry_cutoff(now));

        let recalled: Vec<RecalledMemory> = self
            .store
            .query(query)
            .await?
            .into_iter()
            .filter_map(|entry| {
                let (tier, content) = self.policy.view(&entry, now);
                content.map(|c| RecalledMemory {
                    entry,
                    tier,
                    content: Some(c),
                })
            })
            .collect();

        debug!(count = recalled.len(), store = self.store.name(), "Memories recalled");
        Ok(recalled)
    }

    /// Append `entry`. Content longer than the entry limit is cut first.
    pub async fn remember(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.content.chars().count() > self.max_entry_chars {
            entry.content = entry.content.chars().take(self.max_entry_chars).collect();
        }
        entry.importance = entry.importance.clamp(0.0, 1.0);
        let id = self.store.write(entry).await?;
        info!(memory_id = %id, store = self.store.name(), "Memory written");
        Ok(id)
    }

    /// Every stored entry with its tier at `now`, expired ones included.
    pub async fn inventory(&self, now: DateTime<Utc>) -> Result<Vec<RecalledMemory>, MemoryError> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .map(|entry| {
                let (tier, content) = self.policy.view(&entry, now);
                RecalledMemory {
                    entry,
                    tier,
                    content,
                }
            })
            .collect())
    }

    /// Physically drop expired entries. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, MemoryError> {
        let removed = self.store.purge_before(self.policy.expiry_cutoff(now)).await?;
        if removed > 0 {
            info!(removed, store = self.store.name(), "Expired memories purged");
        }
        Ok(removed)
    }
}

/// Render recalled memories as a prompt section.
pub fn format_context(memories: &[RecalledMemory]) -> String {
    if memories.is_empty() {
        return "No prior sessions on record.".to_string();
    }
    let mut out = String::from("### Prior session memory\n");
    for (i, m) in memories.iter().enumerate() {
        let content = m.content.as_deref().unwrap_or_default();
        out.push_str(&format!("{}. [{}] {}\n", i + 1, m.tier, content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use chrono::Duration;

    fn aged(content: &str, days_ago: i64, importance: f32) -> MemoryEntry {
        let mut entry = MemoryEntry::new(content);
        entry.created_at = Utc::now() - Duration::days(days_ago);
        entry.importance = importance;
        entry
    }

    fn service(store: Arc<InMemoryBackend>) -> MemoryService {
        MemoryService::new(store, RetentionPolicy::default())
    }

    #[tokio::test]
    async fn recall_excludes_expired_and_compresses_old() {
        let store = Arc::new(InMemoryBackend::new());
        let long = format!("smart bottle {}", "detail ".repeat(100));
        store.write(aged(&long, 1, 0.5)).await.unwrap();
        store.write(aged(&long, 45, 0.5)).await.unwrap();
        store.write(aged(&long, 90, 0.5)).await.unwrap();
        store.write(aged(&long, 200, 0.5)).await.unwrap();

        let recalled = service(store).recall("smart bottle", Utc::now()).await.unwrap();
        assert_eq!(recalled.len(), 2);

        let raw = recalled.iter().find(|m| m.tier == MemoryTier::Raw).unwrap();
        assert_eq!(raw.content.as_deref(), Some(long.as_str()));

        let short = recalled.iter().find(|m| m.tier == MemoryTier::ShortSummary).unwrap();
        assert_eq!(short.content.as_ref().unwrap().chars().count(), 100);
        assert!(recalled.iter().all(|m| m.tier != MemoryTier::Expired));
    }

    #[tokio::test]
    async fn remember_truncates_and_clamps() {
        let store = Arc::new(InMemoryBackend::new());
        let svc = service(store.clone()).with_max_entry_chars(10);
        let mut entry = MemoryEntry::new("abcdefghijklmnop");
        entry.importance = 3.0;
        svc.remember(entry).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all[0].content, "abcdefghij");
        assert!((all[0].importance - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn inventory_reports_expired_entries() {
        let store = Arc::new(InMemoryBackend::new());
        store.write(aged("old", 100, 0.5)).await.unwrap();
        let inventory = service(store).inventory(Utc::now()).await.unwrap();
        assert_eq!(inventory[0].tier, MemoryTier::Expired);
        assert!(inventory[0].content.is_none());
    }

    #[tokio::test]
    async fn purge_expired_uses_retention_cutoff() {
        let store = Arc::new(InMemoryBackend::new());
        store.write(aged("old", 100, 0.5)).await.unwrap();
        store.write(aged("young", 10, 0.5)).await.unwrap();
        let removed = service(store.clone()).purge_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn context_formatting() {
        assert!(format_context(&[]).contains("No prior"));
        let m = RecalledMemory {
            entry: MemoryEntry::new("x"),
            tier: MemoryTier::LongSummary,
            content: Some("Smart rings: crowded".into()),
        };
        let ctx = format_context(&[m]);
        assert!(ctx.contains("1. [long-summary] Smart rings: crowded"));
    }
}
