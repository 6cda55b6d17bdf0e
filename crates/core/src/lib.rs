//! # WindowScout Core
//!
//! Domain types, traits, and error definitions for the WindowScout
//! market-window analysis agent. This crate has **no framework
//! dependencies**: it defines the domain model that every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM, patent search, trend data, memory
//! store) is a trait here. Implementations live in their respective crates
//! and are picked by configuration, which keeps the workflow testable with
//! scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod adapter;
pub mod evidence;
pub mod plan;
pub mod report;
pub mod session;
pub mod memory;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{AdapterError, Error, MemoryError, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use adapter::{PatentSearch, TrendData};
pub use evidence::{
    EvidenceItem, EvidenceOutcome, EvidencePayload, EvidenceSlot, PatentRecord, TimeRange,
    TrendPoint, TrendSeries, TrendSummary, UnavailableReason,
};
pub use plan::{Plan, PlanEntry};
pub use report::{DraftReport, ReviewVerdict, RiskLevel, WindowAssessment, WindowSignal};
pub use session::{Session, SessionId, SessionStatus, WorkflowState};
pub use memory::{MemoryEntry, MemoryQuery, MemoryStore, MemoryTier};
pub use event::{DomainEvent, EventBus};
