//! Retention policy: how much of a memory survives at a given age.
//!
//! Pure functions only: the tier is derived from age, importance and the
//! configured thresholds every time it is needed, and never stored.

use chrono::{DateTime, Duration, Utc};
use windowscout_config::MemoryConfig;
use windowscout_core::memory::{MemoryEntry, MemoryTier};

const ELLIPSIS: &str = "...";

/// Thresholds for memory decay.
///
/// Invariant (enforced by config validation):
/// `0 < recent_days <= short_summary_after_days <= retention_days`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    pub recent_days: u32,
    pub short_summary_after_days: u32,
    pub retention_days: u32,
    pub low_importance_threshold: f32,
    pub long_summary_max_chars: usize,
    pub short_summary_max_chars: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl RetentionPolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            recent_days: config.recent_days,
            short_summary_after_days: config.short_summary_after_days,
            retention_days: config.retention_days,
            low_importance_threshold: config.low_importance_threshold,
            long_summary_max_chars: config.long_summary_max_chars,
            short_summary_max_chars: config.short_summary_max_chars,
        }
    }

    /// Classify an entry by age and importance.
    ///
    /// Every boundary belongs to the older tier: an entry exactly
    /// `retention_days` old is expired.
    pub fn classify(&self, age_days: u32, importance: f32) -> MemoryTier {
        if age_days >= self.retention_days {
            MemoryTier::Expired
        } else if age_days < self.recent_days {
            MemoryTier::Raw
        } else if age_days >= self.short_summary_after_days
            || importance < self.low_importance_threshold
        {
            MemoryTier::ShortSummary
        } else {
            MemoryTier::LongSummary
        }
    }

    /// The view of `content` at `tier`. Expired content yields `None`.
    pub fn compress(&self, content: &str, tier: MemoryTier) -> Option<String> {
        match tier {
            MemoryTier::Raw => Some(content.to_string()),
            MemoryTier::LongSummary => Some(truncate_chars(content, self.long_summary_max_chars)),
            MemoryTier::ShortSummary => {
                Some(truncate_chars(content, self.short_summary_max_chars))
            }
            MemoryTier::Expired => None,
        }
    }

    /// Tier and compressed view of `entry` at `now`.
    pub fn view(&self, entry: &MemoryEntry, now: DateTime<Utc>) -> (MemoryTier, Option<String>) {
        let tier = self.classify(entry.age_days(now), entry.importance);
        (tier, self.compress(&entry.content, tier))
    }

    /// Entries created at or before this instant are expired at `now`.
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.retention_days))
    }
}

/// Truncate to at most `max` chars, marking the cut with "..." inside the limit.
fn truncate_chars(content: &str, max: usize) -> String {
    if content.chars().count() <= max {
        return content.to_string();
    }
    let ellipsis_len = ELLIPSIS.len();
    if max <= ellipsis_len {
        return content.chars().take(max).collect();
    }
    let head: String = content.chars().take(max - ellipsis_len).collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetentionPolicy {
        RetentionPolicy::default()
    }

    #[test]
    fn defaults_match_config() {
        let p = policy();
        assert_eq!(p.recent_days, 7);
        assert_eq!(p.short_summary_after_days, 30);
        assert_eq!(p.retention_days, 90);
    }

    #[test]
    fn tier_boundaries_belong_to_the_older_tier() {
        let p = policy();
        assert_eq!(p.classify(0, 0.5), MemoryTier::Raw);
        assert_eq!(p.classify(6, 0.5), MemoryTier::Raw);
        assert_eq!(p.classify(7, 0.5), MemoryTier::LongSummary);
        assert_eq!(p.classify(29, 0.5), MemoryTier::LongSummary);
        assert_eq!(p.classify(30, 0.5), MemoryTier::ShortSummary);
        assert_eq!(p.classify(89, 0.5), MemoryTier::ShortSummary);
        assert_eq!(p.classify(90, 0.5), MemoryTier::Expired);
    }

    #[test]
    fn age_equal_to_retention_is_expired() {
        let p = RetentionPolicy {
            retention_days: 90,
            ..policy()
        };
        assert_eq!(p.classify(90, 1.0), MemoryTier::Expired);
        assert_eq!(p.compress("anything", MemoryTier::Expired), None);
    }

    #[test]
    fn low_importance_skips_long_summary() {
        let p = policy();
        assert_eq!(p.classify(10, 0.1), MemoryTier::ShortSummary);
        assert_eq!(p.classify(3, 0.1), MemoryTier::Raw);
    }

    #[test]
    fn tiering_is_monotone_in_age() {
        let p = policy();
        for importance in [0.0, 0.2, 0.3, 0.5, 1.0] {
            let mut previous = MemoryTier::Raw;
            for age in 0..200 {
                let tier = p.classify(age, importance);
                assert!(tier >= previous, "age {age} importance {importance}");
                previous = tier;
            }
        }
    }

    #[test]
    fn compression_respects_limits() {
        let p = policy();
        let long = "x".repeat(800);
        let long_view = p.compress(&long, MemoryTier::LongSummary).unwrap();
        assert_eq!(long_view.chars().count(), 500);
        assert!(long_view.ends_with("..."));

        let short_view = p.compress(&long, MemoryTier::ShortSummary).unwrap();
        assert_eq!(short_view.chars().count(), 100);

        assert_eq!(p.compress("brief", MemoryTier::ShortSummary).unwrap(), "brief");
        assert_eq!(p.compress(&long, MemoryTier::Raw).unwrap(), long);
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "智能水杯专利".repeat(40);
        let view = truncate_chars(&text, 10);
        assert_eq!(view.chars().count(), 10);
        assert!(view.starts_with("智能水杯专利智"));
    }

    #[test]
    fn same_entry_same_age_same_view() {
        let p = policy();
        let now = Utc::now();
        let mut entry = MemoryEntry::new("Smart water bottles: crowded patent field. ".repeat(20));
        entry.created_at = now - Duration::days(45);
        let first = p.view(&entry, now);
        let second = p.view(&entry, now);
        assert_eq!(first, second);
        assert_eq!(first.0, MemoryTier::ShortSummary);

        // Later re-classification is computed from the stored raw content.
        let later = p.view(&entry, now + Duration::days(10));
        assert_eq!(later, first);
    }

    #[test]
    fn expiry_cutoff_matches_classification() {
        let p = policy();
        let now = Utc::now();
        let mut entry = MemoryEntry::new("old");
        entry.created_at = p.expiry_cutoff(now);
        assert_eq!(p.view(&entry, now).0, MemoryTier::Expired);
    }
}
