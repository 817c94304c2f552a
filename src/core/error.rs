//! Error types for pool and worker operations.

use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a [`PoolError`].
///
/// Callers use this to tell configuration problems apart from transient
/// saturation without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Invalid or missing configuration; fatal to the start attempt only.
    Configuration,
    /// No worker could be used right now; retry later or report upstream.
    Unavailable,
    /// A unit of work failed while executing.
    Execution,
}

/// Errors produced by the task pool and the process worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A process worker could not be brought up during start.
    #[error("worker `{endpoint}` failed to start: {reason}")]
    WorkerStart {
        /// Endpoint descriptor of the worker that failed.
        endpoint: String,
        /// Underlying failure.
        reason: String,
    },
    /// The pool is administratively disabled.
    #[error("pool is disabled")]
    Disabled,
    /// The pool has not been started or was shut down.
    #[error("pool is not running")]
    NotRunning,
    /// No worker became available within the acquisition timeout.
    #[error("no worker available within {timeout:?}")]
    Unavailable {
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The task failed on the acquired worker.
    #[error("task failed: {0}")]
    Task(#[from] WorkerError),
    /// Internal failure (thread spawn, join, runtime bridge).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Classify this error.
    #[must_use]
    pub const fn fault_kind(&self) -> FaultKind {
        match self {
            Self::InvalidConfig(_) | Self::WorkerStart { .. } => FaultKind::Configuration,
            Self::Disabled | Self::NotRunning | Self::Unavailable { .. } => FaultKind::Unavailable,
            Self::Task(_) | Self::Internal(_) => FaultKind::Execution,
        }
    }
}

/// Errors raised by a single [`ProcessWorker`](crate::core::ProcessWorker).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker session is not running.
    #[error("worker session is not running")]
    NotRunning,
    /// Communication with the underlying process failed.
    #[error("process i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The process answered with something unexpected or closed the session.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The task itself reported a failure.
    #[error("task failed: {0}")]
    Failed(String),
}

/// Returned by [`JobContext::checkpoint`](crate::core::JobContext::checkpoint)
/// once a stop has been requested for the running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job stopped on request")]
pub struct JobCancelled;
