//! Keyword ranking shared by the in-process backends.

use windowscout_core::memory::{MemoryEntry, MemoryQuery};

/// Rank `entries` against `query`, most relevant first.
///
/// Entries are scored by the fraction of query terms they contain as whole
/// words. When nothing matches at all, the most recent admitted entries are
/// returned instead so a session still sees its latest history.
pub fn rank<'a>(
    entries: impl IntoIterator<Item = &'a MemoryEntry>,
    query: &MemoryQuery,
) -> Vec<MemoryEntry> {
    let admitted: Vec<&MemoryEntry> = entries.into_iter().filter(|e| query.admits(e)).collect();

    let mut scored: Vec<MemoryEntry> = admitted
        .iter()
        .map(|e| {
            let mut e = (*e).clone();
            e.score = query.relevance(&e.content);
            e
        })
        .filter(|e| e.score > 0.0 && e.score >= query.min_score)
        .collect();

    if scored.is_empty() && query.min_score <= 0.0 {
        scored = admitted.into_iter().cloned().collect();
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    scored.truncate(query.limit);
    scored
}
