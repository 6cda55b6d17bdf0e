//! Shared test helpers for workflow tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use windowscout_core::error::{MemoryError, ProviderError};
use windowscout_core::memory::{MemoryEntry, MemoryQuery, MemoryStore};
use windowscout_core::message::Message;
use windowscout_core::plan::Plan;
use windowscout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use windowscout_core::report::{DraftReport, ReviewVerdict};

use crate::error::ReviewError;
use crate::review::ReviewGate;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request. Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The user prompt of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.user_prompt().unwrap_or_default().to_string())
            .collect()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.requests.lock().unwrap().iter().map(|r| r.temperature).collect()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();

        if count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                responses.len()
            );
        }

        requests.push(request);
        responses[count].clone()
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A report that satisfies the rule gate for `keyword`.
pub fn passing_report(keyword: &str) -> String {
    format!(
        "# Market window report: {keyword}\n\n\
         ## Executive Summary\n\
         The market for {keyword} is growing steadily and incumbents have not locked it up.\n\n\
         ## Patent Landscape\n\
         Ten recent filings, spread across several assignees with no dominant holder.\n\n\
         ## Market Trend\n\
         Search interest rose at a double-digit compound annual rate over three years.\n\n\
         ## Window Assessment\n\
         Window: open\n\
         Demand is rising faster than the patent thicket.\n\n\
         ## Risk Assessment\n\
         Risk level: medium\n\
         Two assignees hold broad claims that need a freedom-to-operate review.\n\n\
         ## Recommendations\n\
         Enter within twelve months and file defensively around sensing features.\n"
    )
}

/// Returns scripted verdicts in order, then repeats the last one.
pub struct ScriptedGate {
    script: Vec<(bool, String)>,
    calls: Mutex<usize>,
}

impl ScriptedGate {
    pub fn new(script: Vec<(bool, &str)>) -> Self {
        Self {
            script: script.into_iter().map(|(p, f)| (p, f.to_string())).collect(),
            calls: Mutex::new(0),
        }
    }

    pub fn always_fail() -> Self {
        Self::new(vec![(false, "Still not good enough.")])
    }
}

#[async_trait]
impl ReviewGate for ScriptedGate {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn review(&self, draft: &DraftReport, _plan: &Plan) -> Result<ReviewVerdict, ReviewError> {
        let mut calls = self.calls.lock().unwrap();
        let index = (*calls).min(self.script.len() - 1);
        *calls += 1;
        let (passed, feedback) = &self.script[index];
        Ok(if *passed {
            ReviewVerdict::pass(draft.revision)
        } else {
            ReviewVerdict::fail(draft.revision, feedback.clone())
        })
    }
}

/// Errors for the first `failures` calls, then passes.
pub struct FailingGate {
    failures: usize,
    calls: Mutex<usize>,
}

impl FailingGate {
    pub fn then_pass(failures: usize) -> Self {
        Self {
            failures,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ReviewGate for FailingGate {
    fn name(&self) -> &str {
        "failing"
    }

    async fn review(&self, draft: &DraftReport, _plan: &Plan) -> Result<ReviewVerdict, ReviewError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls <= self.failures {
            return Err(ReviewError::Provider(ProviderError::Timeout("review".into())));
        }
        Ok(ReviewVerdict::pass(draft.revision))
    }
}

/// A store whose writes always fail. Reads succeed and are empty.
pub struct FailingMemoryStore;

#[async_trait]
impl MemoryStore for FailingMemoryStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn write(&self, _entry: MemoryEntry) -> Result<String, MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
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
