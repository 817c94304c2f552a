//! Build both pools from a [`PoolsConfig`].

use tracing::info;

use crate::config::PoolsConfig;
use crate::core::{PoolError, PriorityTaskPool, ProcessWorker, ProcessWorkerPool};

/// The task pool and the process worker pool built from one configuration.
pub struct Pools<W: ProcessWorker> {
    /// In-process priority pool.
    pub task_pool: PriorityTaskPool,
    /// Pool of external process workers, already started unless disabled.
    pub process_pool: ProcessWorkerPool<W>,
}

impl<W: ProcessWorker> Pools<W> {
    /// Shut down the task pool (waiting for running jobs), then the process pool.
    pub fn shutdown(&self) {
        self.task_pool.shutdown();
        self.process_pool.shutdown();
    }
}

/// Validate `cfg`, create the task pool, and start a process worker pool
/// whose workers are built by `factory`.
///
/// # Errors
///
/// - `PoolError::InvalidConfig` if either section is invalid
/// - `PoolError::WorkerStart` if a process worker fails to start
/// - `PoolError::Internal` if a worker thread cannot be spawned
pub fn build_pools<W, F>(cfg: &PoolsConfig, factory: F) -> Result<Pools<W>, PoolError>
where
    W: ProcessWorker,
    F: Fn(&str) -> W + Send + Sync + 'static,
{
    cfg.validate().map_err(PoolError::InvalidConfig)?;

    let task_pool = PriorityTaskPool::new(cfg.task_pool.clone())?;
    let process_pool = ProcessWorkerPool::new(factory);
    if let Err(e) = process_pool.start(&cfg.process_pool) {
        task_pool.shutdown();
        return Err(e);
    }

    info!(
        task_pool = %cfg.task_pool.name,
        process_workers = process_pool.worker_count(),
        process_pool_enabled = process_pool.is_enabled(),
        "Pools built"
    );
    Ok(Pools {
        task_pool,
        process_pool,
    })
}
