//! Draft reports and review verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall market-entry risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

/// Whether the market window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSignal {
    Open,
    Closing,
    Closed,
    Unknown,
}

/// Structured risk/window assessment extracted from a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowAssessment {
    pub risk: RiskLevel,
    pub window: WindowSignal,
}

impl WindowAssessment {
    /// Parse `Risk level: <low|medium|high>` and `Window: <open|closing|closed>`
    /// lines (case-insensitive, Markdown emphasis ignored). The first match
    /// of each wins; anything missing is `Unknown`.
    pub fn parse(narrative: &str) -> Self {
        let mut risk = RiskLevel::Unknown;
        let mut window = WindowSignal::Unknown;

        for line in narrative.lines() {
            let clean: String = line
                .chars()
                .filter(|c| !matches!(c, '*' | '_' | '#' | '`'))
                .collect::<String>()
                .trim()
                .trim_start_matches(['-', ' '])
                .to_lowercase();

            if risk == RiskLevel::Unknown {
                if let Some(value) = clean.strip_prefix("risk level:") {
                    risk = match first_word(value) {
                        "low" => RiskLevel::Low,
                        "medium" | "moderate" => RiskLevel::Medium,
                        "high" => RiskLevel::High,
                        _ => RiskLevel::Unknown,
                    };
                }
            }
            if window == WindowSignal::Unknown {
                if let Some(value) = clean.strip_prefix("window:") {
                    window = match first_word(value) {
                        "open" => WindowSignal::Open,
                        "closing" => WindowSignal::Closing,
                        "closed" => WindowSignal::Closed,
                        _ => WindowSignal::Unknown,
                    };
                }
            }
        }

        Self { risk, window }
    }
}

fn first_word(s: &str) -> &str {
    s.split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or("")
}

/// One synthesis attempt. Each retry produces a new revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReport {
    /// 1-based attempt number.
    pub revision: u32,
    /// Markdown narrative.
    pub narrative: String,
    pub assessment: WindowAssessment,
    pub created_at: DateTime<Utc>,
}

impl DraftReport {
    pub fn new(revision: u32, narrative: impl Into<String>) -> Self {
        let narrative = narrative.into();
        let assessment = WindowAssessment::parse(&narrative);
        Self {
            revision,
            narrative,
            assessment,
            created_at: Utc::now(),
        }
    }
}

/// The review gate's decision on one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Revision this verdict applies to.
    pub revision: u32,
    pub passed: bool,
    /// Non-empty whenever `passed` is false.
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl ReviewVerdict {
    pub fn pass(revision: u32) -> Self {
        Self {
            revision,
            passed: true,
            feedback: String::new(),
            score: None,
        }
    }

    /// A failing verdict. Blank feedback is replaced with a generic note.
    pub fn fail(revision: u32, feedback: impl Into<String>) -> Self {
        let feedback = feedback.into();
        let feedback = if feedback.trim().is_empty() {
            "Report did not meet the review criteria; revise and resubmit.".to_string()
        } else {
            feedback
        };
        Self {
            revision,
            passed: false,
            feedback,
            score: None,
        }
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score.min(10));
        self
    }
}
