//! Domain event system: live progress of running sessions.
//!
//! The orchestrator publishes an event whenever a session moves. The CLI
//! subscribes to print an execution trace; nothing in the workflow depends
//! on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::evidence::UnavailableReason;
use crate::session::{SessionStatus, WorkflowState};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A session was created for a query
    SessionStarted {
        session_id: String,
        query: String,
        timestamp: DateTime<Utc>,
    },

    /// A session entered a workflow state
    StateEntered {
        session_id: String,
        state: WorkflowState,
        iteration: u32,
        timestamp: DateTime<Utc>,
    },

    /// One plan entry finished fetching
    EvidenceFetched {
        session_id: String,
        entry: String,
        items: usize,
        unavailable: Option<UnavailableReason>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The review gate returned a verdict
    ReviewCompleted {
        session_id: String,
        revision: u32,
        passed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A session reached a terminal status
    SessionFinished {
        session_id: String,
        status: SessionStatus,
        cause: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
