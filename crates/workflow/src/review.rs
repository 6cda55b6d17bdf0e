//! Review gates: decide whether a draft is good enough to stop retrying.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use windowscout_core::plan::Plan;
use windowscout_core::provider::{Provider, ProviderRequest};
use windowscout_core::report::{DraftReport, ReviewVerdict, RiskLevel};

use crate::error::ReviewError;
use crate::settings::WorkflowSettings;

/// Judges one draft revision against the plan it was written for.
#[async_trait]
pub trait ReviewGate: Send + Sync {
    fn name(&self) -> &str;

    /// The verdict's `revision` must equal `draft.revision`.
    async fn review(&self, draft: &DraftReport, plan: &Plan) -> Result<ReviewVerdict, ReviewError>;
}

/// A required report section and the heading words that satisfy it.
struct Section {
    title: &'static str,
    aliases: &'static [&'static str],
}

const REQUIRED_SECTIONS: &[Section] = &[
    Section { title: "Executive Summary", aliases: &["executive summary", "summary"] },
    Section { title: "Patent Landscape", aliases: &["patent"] },
    Section { title: "Market Trend", aliases: &["trend", "market"] },
    Section { title: "Window Assessment", aliases: &["window", "why now"] },
    Section { title: "Risk Assessment", aliases: &["risk"] },
    Section { title: "Recommendations", aliases: &["recommend", "action"] },
];

/// Deterministic structural checks. No LLM involved.
pub struct RuleReviewGate {
    min_chars: usize,
}

impl RuleReviewGate {
    pub const DEFAULT_MIN_CHARS: usize = 400;

    pub fn new() -> Self {
        Self {
            min_chars: Self::DEFAULT_MIN_CHARS,
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Every problem found in `draft`. Empty means the draft passes.
    pub fn problems(&self, draft: &DraftReport, plan: &Plan) -> Vec<String> {
        let headings: Vec<String> = draft
            .narrative
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('#'))
            .map(|l| l.trim_start_matches('#').trim().to_lowercase())
            .collect();

        let mut problems: Vec<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|s| {
                !headings
                    .iter()
                    .any(|h| s.aliases.iter().any(|a| h.contains(a)))
            })
            .map(|s| format!("Missing section: {}.", s.title))
            .collect();

        let chars = draft.narrative.chars().count();
        if chars < self.min_chars {
            problems.push(format!(
                "Report is too short ({chars} characters; at least {} required).",
                self.min_chars
            ));
        }

        let body = draft.narrative.to_lowercase();
        if !plan.keywords.is_empty()
            && !plan.keywords.iter().any(|k| body.contains(&k.to_lowercase()))
        {
            problems.push(format!(
                "None of the analysed keywords are discussed ({}).",
                plan.keywords.join(", ")
            ));
        }

        if draft.assessment.risk == RiskLevel::Unknown {
            problems.push(
                "No risk level found; add a line `Risk level: low|medium|high`.".to_string(),
            );
        }
        problems
    }
}

impl Default for RuleReviewGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewGate for RuleReviewGate {
    fn name(&self) -> &str {
        "rules"
    }

    async fn review(&self, draft: &DraftReport, plan: &Plan) -> Result<ReviewVerdict, ReviewError> {
        let problems = self.problems(draft, plan);
        let score = 10u8.saturating_sub((problems.len() as u8).saturating_mul(2));
        debug!(revision = draft.revision, problems = problems.len(), "Rule review finished");
        if problems.is_empty() {
            Ok(ReviewVerdict::pass(draft.revision).with_score(score))
        } else {
            Ok(ReviewVerdict::fail(draft.revision, problems.join("\n")).with_score(score))
        }
    }
}

const REVIEW_SYSTEM: &str = "You are a strict reviewer of market-window analysis reports.";

/// Asks the LLM to grade the draft. The reply is the feedback.
pub struct LlmReviewGate {
    provider: Arc<dyn Provider>,
    model: String,
}

impl LlmReviewGate {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ReviewGate for LlmReviewGate {
    fn name(&self) -> &str {
        "llm"
    }

    async fn review(&self, draft: &DraftReport, plan: &Plan) -> Result<ReviewVerdict, ReviewError> {
        let prompt = format!(
            "Review this market-window report for the keywords: {}.\n\n\
             Check: are the conclusions supported by the evidence, are patent and trend data \
             both discussed, is the risk level stated, are recommendations actionable?\n\n\
             Reply with JSON: {{\"passed\": true|false, \"score\": 0-10, \"feedback\": \"...\"}}\n\n\
             ---\n{}",
            plan.keywords.join(", "),
            draft.narrative
        );
        let request = ProviderRequest::prompt(&self.model, REVIEW_SYSTEM, prompt)
            .with_temperature(0.0)
            .with_max_tokens(1024)
            .with_context("stage", "review".into())
            .with_context("revision", draft.revision.into());

        let reply = self.provider.complete(request).await?.message.content;
        let (passed, score) = read_verdict(&reply);
        let verdict = if passed {
            ReviewVerdict::pass(draft.revision)
        } else {
            ReviewVerdict::fail(draft.revision, reply.trim())
        };
        Ok(match score {
            Some(score) => verdict.with_score(score),
            None => verdict,
        })
    }
}

/// `(passed, score)` from a reviewer reply.
///
/// The first JSON object carrying a `passed` key wins; keys match
/// case-insensitively. Replies with no parseable object fall back to a
/// case- and whitespace-insensitive scan for `"passed": true`.
fn read_verdict(reply: &str) -> (bool, Option<u8>) {
    if let Some(object) = first_verdict_object(reply) {
        let passed = match field(&object, "passed") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        };
        let score = field(&object, "score").and_then(score_value);
        return (passed, score);
    }

    let compact: String = reply
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (compact.contains("\"passed\":true"), parse_score(&compact))
}

fn first_verdict_object(text: &str) -> Option<Map<String, Value>> {
    for (start, _) in text.match_indices('{') {
        for (offset, _) in text[start..].match_indices('}') {
            let candidate = &text[start..=start + offset];
            if let Ok(object) = serde_json::from_str::<Map<String, Value>>(candidate) {
                if field(&object, "passed").is_some() {
                    return Some(object);
                }
            }
        }
    }
    None
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object
        .iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn score_value(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(score.round().clamp(0.0, 10.0) as u8)
}

/// The integer after `"score":`, if any.
fn parse_score(reply: &str) -> Option<u8> {
    let rest = &reply[reply.find("\"score\"")? + "\"score\"".len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// The gate named by `agent.review_gate`. Unknown names get the rule gate.
pub fn build_gate(
    name: &str,
    provider: Arc<dyn Provider>,
    settings: &WorkflowSettings,
) -> Arc<dyn ReviewGate> {
    match name {
        "llm" => Arc::new(LlmReviewGate::new(provider, settings.model.clone())),
        _ => Arc::new(RuleReviewGate::new()),
    }
}
