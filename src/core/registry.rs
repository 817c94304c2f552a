//! Identity-keyed index of live (queued or running) jobs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{Job, JobId, JobInfo, StopToken};

/// Lifecycle of a registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting in the queue.
    Queued = 0,
    /// A worker is executing the body.
    Running = 1,
    /// Execution ended (any outcome).
    Finished = 2,
    /// Removed from the queue before it ever ran.
    Cancelled = 3,
}

impl From<u8> for JobState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Queued,
            1 => Self::Running,
            2 => Self::Finished,
            _ => Self::Cancelled,
        }
    }
}

/// Registry view of one live job.
#[derive(Debug)]
pub struct JobHandle {
    info: Arc<JobInfo>,
    stop: StopToken,
    ticket: u64,
    state: AtomicU8,
}

impl JobHandle {
    /// The job's info.
    #[must_use]
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    /// Submission ticket, unique within one pool.
    #[must_use]
    pub const fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> JobState {
        JobState::from(self.state.load(Ordering::Acquire))
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    pub(crate) fn request_stop(&self) -> bool {
        self.stop.request()
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Thread-safe index of queued and executing jobs by identity.
///
/// Two live jobs submitted under the same identity are tracked as separate
/// entries; lookups return the oldest one.
#[derive(Debug, Default)]
pub struct JobRegistry {
    entries: Mutex<HashMap<JobId, Vec<Arc<JobHandle>>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `job` under its identity with the given submission ticket.
    pub fn register(&self, job: &Job, ticket: u64) -> Arc<JobHandle> {
        let handle = Arc::new(JobHandle {
            info: Arc::clone(&job.info),
            stop: job.stop.clone(),
            ticket,
            state: AtomicU8::new(JobState::Queued as u8),
        });
        let mut entries = self.entries.lock();
        let slot = entries.entry(job.id().clone()).or_default();
        if !slot.is_empty() {
            tracing::warn!(
                job_id = %job.id(),
                live = slot.len(),
                "job identity already live, tracking duplicate separately"
            );
        }
        slot.push(Arc::clone(&handle));
        handle
    }

    /// Stop tracking the entry for `id` registered with `ticket`.
    pub fn unregister(&self, id: &JobId, ticket: u64) -> Option<Arc<JobHandle>> {
        let mut entries = self.entries.lock();
        let slot = entries.get_mut(id)?;
        let pos = slot.iter().position(|h| h.ticket == ticket)?;
        let handle = slot.remove(pos);
        if slot.is_empty() {
            entries.remove(id);
        }
        Some(handle)
    }

    /// Oldest live entry for `id`.
    #[must_use]
    pub fn find(&self, id: &JobId) -> Option<Arc<JobHandle>> {
        self.entries.lock().get(id).and_then(|slot| slot.first().cloned())
    }

    /// The entry for `id` registered with `ticket`.
    #[must_use]
    pub fn get(&self, id: &JobId, ticket: u64) -> Option<Arc<JobHandle>> {
        self.entries
            .lock()
            .get(id)
            .and_then(|slot| slot.iter().find(|h| h.ticket == ticket).cloned())
    }

    /// Every live entry for `id`, oldest first.
    #[must_use]
    pub fn find_all(&self, id: &JobId) -> Vec<Arc<JobHandle>> {
        self.entries.lock().get(id).cloned().unwrap_or_default()
    }

    /// Distinct identities with at least one live entry.
    #[must_use]
    pub fn ids(&self) -> Vec<JobId> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Snapshot of every live entry.
    #[must_use]
    pub fn handles(&self) -> Vec<Arc<JobHandle>> {
        self.entries.lock().values().flatten().cloned().collect()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
