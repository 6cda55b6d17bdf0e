//! Memory trait: long-term knowledge carried across sessions.
//!
//! Entries are append-only: a session writes one condensed entry at the end
//! of its run and never mutates historical entries. How much of an entry is
//! shown on recall depends on its age (see the retention policy in
//! `windowscout-memory`); the stored content itself stays verbatim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use crate::error::MemoryError;

/// A single memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory (assigned on write when empty)
    pub id: String,

    /// The content of the memory, stored verbatim
    pub content: String,

    /// Tags for categorization (e.g., "analysis_session", plan keywords)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Originating session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// When this memory was created
    pub created_at: DateTime<Utc>,

    /// How informative the entry is for future sessions (0.0–1.0)
    #[serde(default = "default_importance")]
    pub importance: f32,

    /// Relevance score (set by query operations)
    #[serde(default)]
    pub score: f32,
}

fn default_importance() -> f32 {
    0.5
}

impl MemoryEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            tags: Vec::new(),
            source: None,
            created_at: Utc::now(),
            importance: default_importance(),
            score: 0.0,
        }
    }

    /// Age in whole days at `now` (never negative).
    pub fn age_days(&self, now: DateTime<Utc>) -> u32 {
        (now - self.created_at).num_days().clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// How much of an entry survives at its current age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// Kept verbatim
    Raw,
    /// Compressed to the long summary limit
    LongSummary,
    /// Compressed to the short summary limit
    ShortSummary,
    /// Excluded from recall
    Expired,
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemoryTier::Raw => "raw",
            MemoryTier::LongSummary => "long-summary",
            MemoryTier::ShortSummary => "short-summary",
            MemoryTier::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A query for recalling memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// The session context to match against (usually the user query)
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_score: f32,

    /// Filter by tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Exclude entries created before this instant (the expiry cutoff)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
}

fn default_limit() -> usize {
    10
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: default_limit(),
            min_score: 0.0,
            tags: Vec::new(),
            not_before: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn not_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.not_before = Some(cutoff);
        self
    }

    /// Lowercased alphanumeric query terms, de-duplicated, in order.
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for t in tokens(&self.text) {
            if !terms.contains(&t) {
                terms.push(t);
            }
        }
        terms
    }

    /// Fraction of query terms appearing as whole words in `content`
    /// (0.0 when none match).
    pub fn relevance(&self, content: &str) -> f32 {
        let terms = self.terms();
        if terms.is_empty() {
            return 0.0;
        }
        let words: HashSet<String> = tokens(content).collect();
        let hits = terms.iter().filter(|t| words.contains(t.as_str())).count();
        hits as f32 / terms.len() as f32
    }

    /// Whether `entry` passes the tag and cutoff filters.
    pub fn admits(&self, entry: &MemoryEntry) -> bool {
        let tag_match = self.tags.is_empty() || self.tags.iter().any(|t| entry.tags.contains(t));
        let fresh = self.not_before.is_none_or(|cutoff| entry.created_at > cutoff);
        tag_match && fresh
    }
}

/// Lowercased alphanumeric runs of `text`.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// The core MemoryStore trait.
///
/// Implementations: in-memory (testing), JSONL file, none (no-op).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Append a new entry. Returns its ID.
    async fn write(&self, entry: MemoryEntry) -> std::result::Result<String, MemoryError>;

    /// Entries matching the query, most relevant first.
    async fn query(&self, query: MemoryQuery) -> std::result::Result<Vec<MemoryEntry>, MemoryError>;

    /// Every stored entry, oldest first.
    async fn all(&self) -> std::result::Result<Vec<MemoryEntry>, MemoryError>;

    /// Physically remove entries created at or before `cutoff`. Returns the
    /// number removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> std::result::Result<usize, MemoryError>;

    /// Get total entry count.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}
