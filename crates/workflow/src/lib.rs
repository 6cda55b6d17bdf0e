//! # WindowScout Workflow
//!
//! Drives one analysis session through its states:
//!
//! 1. **Planning**: recall memory, ask the LLM for keywords, build plan entries
//! 2. **Fetching**: run every entry concurrently under a per-call deadline,
//!    then ask the LLM for a patent landscape analysis
//! 3. **Synthesizing**: write a Markdown draft from the evidence digests
//! 4. **Reviewing**: gate the draft; failures loop back to synthesis
//! 5. **Memory update**: condense the session into one memory entry
//!
//! The [`Orchestrator`] owns the loop. Each step is usable on its own.

pub mod analysis;
pub mod archive;
pub mod error;
pub mod fetch;
pub mod memory_update;
pub mod orchestrator;
pub mod outcome;
pub mod planner;
pub mod review;
pub mod settings;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use analysis::PatentAnalyst;
pub use archive::{ArchiveError, ArchiveSummary, InMemoryArchive, JsonDirArchive, SessionArchive};
pub use error::{AnalysisError, PlanningError, ReviewError, SynthesisError, WorkflowError};
pub use orchestrator::Orchestrator;
pub use outcome::{SessionOutcome, TraceStep};
pub use review::{LlmReviewGate, ReviewGate, RuleReviewGate, build_gate};
pub use settings::WorkflowSettings;
pub use tokio_util::sync::CancellationToken;
