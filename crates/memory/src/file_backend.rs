//! File-based memory backend: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `MemoryEntry`. Writes append a single line;
//! only a purge rewrites the file.
//!
//! Storage location: `~/.windowscout/memory/memories.jsonl`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;
use windowscout_core::error::MemoryError;
use windowscout_core::memory::{MemoryEntry, MemoryQuery, MemoryStore};

use crate::search::rank;

/// A file-backed memory store using JSONL (one JSON object per line).
///
/// Entries are loaded into memory on creation; every mutation is written
/// through to disk before it becomes visible to readers.
pub struct FileBackend {
    path: PathBuf,
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl FileBackend {
    /// Open the store at `path`. A missing file means an empty store; the
    /// file is created on first write.
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory backend loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<MemoryEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    fn ensure_parent(&self) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }
        Ok(())
    }

    fn encode(entry: &MemoryEntry) -> Result<String, MemoryError> {
        serde_json::to_string(entry)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize memory entry: {e}")))
    }

    /// Append one entry as a line.
    fn append(&self, entry: &MemoryEntry) -> Result<(), MemoryError> {
        self.ensure_parent()?;
        let line = Self::encode(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| MemoryError::Storage(format!("Failed to open memory file: {e}")))?;
        writeln!(file, "{line}")
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))
    }

    /// Rewrite the whole file from `entries`.
    fn rewrite(&self, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        self.ensure_parent()?;
        let mut content = String::new();
        for entry in entries {
            content.push_str(&Self::encode(entry)?);
            content.push('\n');
        }
        std::fs::write(&self.path, &content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))
    }
}

#[async_trait]
impl MemoryStore for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let id = entry.id.clone();
        let mut entries = self.entries.write().await;
        self.append(&entry)?;
        entries.push(entry);
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
        let kept: Vec<MemoryEntry> = entries
            .iter()
            .filter(|e| e.created_at > cutoff)
            .cloned()
            .collect();
        let removed = entries.len() - kept.len();
        if removed > 0 {
            self.rewrite(&kept)?;
            *entries = kept;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
