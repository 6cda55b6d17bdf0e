//! Session archive. Finished sessions are kept, never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use windowscout_core::session::SessionStatus;

use crate::outcome::SessionOutcome;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("archive serialization error: {0}")]
    Serialization(String),
}

/// One line of `reports list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSummary {
    pub session_id: String,
    pub query: String,
    pub status: SessionStatus,
    pub iterations: u32,
    pub finished_at: DateTime<Utc>,
}

impl From<&SessionOutcome> for ArchiveSummary {
    fn from(o: &SessionOutcome) -> Self {
        Self {
            session_id: o.session.id.to_string(),
            query: o.session.query.clone(),
            status: o.status,
            iterations: o.session.iteration,
            finished_at: o.finished_at,
        }
    }
}

#[async_trait]
pub trait SessionArchive: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, outcome: &SessionOutcome) -> Result<(), ArchiveError>;

    async fn load(&self, session_id: &str) -> Result<Option<SessionOutcome>, ArchiveError>;

    /// Summaries, most recently finished first.
    async fn list(&self) -> Result<Vec<ArchiveSummary>, ArchiveError>;
}

/// Process-local archive.
#[derive(Default)]
pub struct InMemoryArchive {
    outcomes: Arc<RwLock<Vec<SessionOutcome>>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionArchive for InMemoryArchive {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save(&self, outcome: &SessionOutcome) -> Result<(), ArchiveError> {
        let mut outcomes = self.outcomes.write().await;
        outcomes.retain(|o| o.session.id != outcome.session.id);
        outcomes.push(outcome.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionOutcome>, ArchiveError> {
        let outcomes = self.outcomes.read().await;
        Ok(outcomes.iter().find(|o| o.session.id.0 == session_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ArchiveSummary>, ArchiveError> {
        let outcomes = self.outcomes.read().await;
        let mut summaries: Vec<ArchiveSummary> = outcomes.iter().map(ArchiveSummary::from).collect();
        summaries.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(summaries)
    }
}

/// One pretty-printed JSON file per session: `<dir>/<session_id>.json`.
pub struct JsonDirArchive {
    dir: PathBuf,
}

impl JsonDirArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

fn io_error(path: &std::path::Path, e: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl SessionArchive for JsonDirArchive {
    fn name(&self) -> &str {
        "json_dir"
    }

    async fn save(&self, outcome: &SessionOutcome) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        let path = self.path_for(&outcome.session.id.0);
        let json = serde_json::to_string_pretty(outcome)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), "Session archived");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionOutcome>, ArchiveError> {
        // Ids are file stems; anything with a separator cannot name an archive file.
        if session_id.is_empty() || session_id.contains(['/', '\\', '.']) {
            return Ok(None);
        }
        let path = self.path_for(session_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<ArchiveSummary>, ArchiveError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&self.dir, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(text) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            match serde_json::from_str::<SessionOutcome>(&text) {
                Ok(outcome) => summaries.push(ArchiveSummary::from(&outcome)),
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable archive file"),
            }
        }
        summaries.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(summaries)
    }
}
