//! Job lifecycle audit events.
//!
//! The task pool records one event per lifecycle transition when a sink is
//! attached with [`PriorityTaskPool::with_audit`](crate::core::PriorityTaskPool::with_audit).

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::{JobId, JobOutcome};
use crate::util::clock::now_ms;

/// Lifecycle transition being recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Accepted into the queue.
    Submitted,
    /// Refused by the pool and handed to the rejection handler.
    Rejected,
    /// A worker began executing the body.
    Started,
    /// Execution ended with the given outcome.
    Finished(JobOutcome),
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Related job identity.
    pub job_id: JobId,
    /// Job priority rank.
    pub priority: i32,
    /// Pool name.
    pub pool: String,
    /// Action taken.
    pub action: JobAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Identities of jobs that recorded `action`, oldest first.
    pub fn ids_with(&self, action: &JobAction) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.action == action)
            .map(|e| e.job_id.to_string())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    job_id: &JobId,
    priority: i32,
    pool: impl Into<String>,
    action: JobAction,
) -> AuditEvent {
    AuditEvent {
        job_id: job_id.clone(),
        priority,
        pool: pool.into(),
        action,
        created_at_ms: now_ms(),
    }
}
