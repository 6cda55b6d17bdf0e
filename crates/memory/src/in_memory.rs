//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use windowscout_core::error::MemoryError;
use windowscout_core::memory::{MemoryEntry, MemoryQuery, MemoryStore};

use crate::search::rank;

/// An in-memory store that keeps entries in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn write(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn query(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(rank(entries.iter(), &query))
    }

    async fn all(&self) -> Result<Vec<MemoryEntry>, MemoryError> {
        let mut entries = self.entries.read().await.clone();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, MemoryError> {
        let mut entries = self.entries.write().await;
        let len_before = entries.len();
        entries.retain(|e| e.created_at > cutoff);
        Ok(len_before - entries.len())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
