//! Tokio adapters that move blocking pool calls onto the blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{PoolError, PriorityTaskPool, ProcessWorker, ProcessWorkerPool};

fn join_error(e: &tokio::task::JoinError) -> PoolError {
    PoolError::Internal(format!("blocking task failed: {e}"))
}

/// [`ProcessWorkerPool::execute`] without blocking the async runtime.
///
/// # Errors
///
/// Same as [`ProcessWorkerPool::execute`], plus `PoolError::Internal` if the
/// blocking task panicked or was cancelled.
pub async fn execute_async<W>(
    pool: Arc<ProcessWorkerPool<W>>,
    task: W::Task,
) -> Result<W::Output, PoolError>
where
    W: ProcessWorker,
    W::Task: Send + 'static,
    W::Output: Send + 'static,
{
    tokio::task::spawn_blocking(move || pool.execute(task))
        .await
        .map_err(|e| join_error(&e))?
}

/// [`PriorityTaskPool::shutdown`] without blocking the async runtime.
///
/// # Errors
///
/// Returns `PoolError::Internal` if the blocking task panicked or was cancelled.
pub async fn shutdown_async(pool: Arc<PriorityTaskPool>) -> Result<(), PoolError> {
    tokio::task::spawn_blocking(move || pool.shutdown())
        .await
        .map_err(|e| join_error(&e))
}

/// [`PriorityTaskPool::await_termination`] without blocking the async runtime.
///
/// # Errors
///
/// Returns `PoolError::Internal` if the blocking task panicked or was cancelled.
pub async fn await_termination_async(
    pool: Arc<PriorityTaskPool>,
    timeout: Duration,
) -> Result<bool, PoolError> {
    tokio::task::spawn_blocking(move || pool.await_termination(timeout))
        .await
        .map_err(|e| join_error(&e))
}
