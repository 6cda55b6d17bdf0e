//! Workflow-level errors.
//!
//! Adapter failures never appear here: they become unavailable evidence
//! slots during fetching. Only failures that end a session are modeled.

use thiserror::Error;
use windowscout_core::error::ProviderError;
use windowscout_core::session::TransitionError;

/// The planning step could not produce a plan.
#[derive(Debug, Clone, Error)]
pub enum PlanningError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("planner provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// The synthesis step could not produce a draft.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("synthesis provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// The patent landscape analysis failed. Never ends a session.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("analysis provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// The review gate could not reach a verdict.
#[derive(Debug, Clone, Error)]
pub enum ReviewError {
    #[error("review provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Anything that ends a session as `failed`.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("every data source was unavailable")]
    AllSourcesUnavailable,

    #[error("session cancelled")]
    Cancelled,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl WorkflowError {
    /// Human-readable failure cause. Never includes raw provider output.
    pub fn public_cause(&self) -> String {
        match self {
            WorkflowError::Planning(PlanningError::EmptyQuery) => "query is empty".into(),
            WorkflowError::Planning(PlanningError::Provider(e)) => {
                format!("planning failed: {}", e.public_cause())
            }
            WorkflowError::Synthesis(SynthesisError::Provider(e)) => {
                format!("report synthesis failed: {}", e.public_cause())
            }
            WorkflowError::AllSourcesUnavailable => {
                "no evidence could be fetched: every data source was unavailable".into()
            }
            WorkflowError::Cancelled => "session cancelled".into(),
            WorkflowError::Transition(_) => "internal error: invalid state transition".into(),
        }
    }
}
