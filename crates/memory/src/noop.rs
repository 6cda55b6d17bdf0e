//! No-op memory backend: disables long-term memory entirely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use windowscout_core::error::MemoryError;
use windowscout_core::memory::{MemoryEntry, MemoryQuery, MemoryStore};

/// A memory store that keeps nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryStore for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn write(&self, _entry: MemoryEntry) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn query(&self, _query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn all(&self) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn purge_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, MemoryError> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(0)
    }
}
