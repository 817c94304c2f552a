//! Fixed-size pool of [`ProcessWorker`]s with bounded-wait acquisition.
//!
//! Idle workers sit in an availability queue whose capacity equals the worker
//! count. [`ProcessWorkerPool::execute`] takes one out (waiting at most the
//! configured timeout), runs a single task on it, and puts it back on every
//! path out of the call, including task failures and panics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::ProcessPoolConfig;
use crate::core::{PoolError, ProcessWorker, WorkerError};

/// Builds a worker for one endpoint descriptor.
type Factory<W> = Box<dyn Fn(&str) -> W + Send + Sync>;

struct WorkerSlot<W> {
    endpoint: String,
    worker: Mutex<W>,
}

/// Workers constructed by one successful `start`.
struct Generation<W> {
    workers: Vec<WorkerSlot<W>>,
    available_tx: Sender<usize>,
    available_rx: Receiver<usize>,
    /// Dropped on shutdown to wake callers blocked on acquisition.
    closed_tx: Mutex<Option<Sender<()>>>,
    closed_rx: Receiver<()>,
    acquire_timeout: Duration,
    running: AtomicBool,
}

impl<W> Generation<W> {
    fn release(&self, idx: usize) {
        if !self.running.load(Ordering::Acquire) {
            debug!(worker = idx, "Pool stopped, not returning worker to availability queue");
            return;
        }
        if self.available_tx.try_send(idx).is_err() {
            error!(worker = idx, "Availability queue refused returning worker");
        }
    }
}

/// Returns the worker to the availability queue when dropped.
struct Checkout<'a, W> {
    generation: &'a Generation<W>,
    idx: usize,
}

impl<W> Drop for Checkout<'_, W> {
    fn drop(&mut self) {
        self.generation.release(self.idx);
    }
}

/// Fixed-size pool of heavyweight process workers.
pub struct ProcessWorkerPool<W: ProcessWorker> {
    factory: Factory<W>,
    /// Serializes start, shutdown and restart.
    lifecycle: Mutex<()>,
    active: RwLock<Option<Arc<Generation<W>>>>,
    enabled: AtomicBool,
}

impl<W: ProcessWorker> ProcessWorkerPool<W> {
    /// Create a stopped pool that builds workers with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> W + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            lifecycle: Mutex::new(()),
            active: RwLock::new(None),
            enabled: AtomicBool::new(true),
        }
    }

    /// Validate `config`, then build, start and publish one worker per endpoint.
    ///
    /// Calling this on a running pool does nothing, whatever `config` says.
    /// Otherwise a disabled configuration is recorded and nothing is started.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::WorkerStart` if a worker fails to start; workers already
    ///   started in this attempt are shut down again
    pub fn start(&self, config: &ProcessPoolConfig) -> Result<(), PoolError> {
        let _lifecycle = self.lifecycle.lock();
        self.start_locked(config)
    }

    fn start_locked(&self, config: &ProcessPoolConfig) -> Result<(), PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        if self.active.read().is_some() {
            debug!("Process worker pool already running");
            return Ok(());
        }

        if !config.enabled {
            self.enabled.store(false, Ordering::Release);
            info!("Process worker pool is disabled, not starting workers");
            return Ok(());
        }
        self.enabled.store(true, Ordering::Release);

        let mut started: Vec<WorkerSlot<W>> = Vec::with_capacity(config.endpoints.len());
        for endpoint in &config.endpoints {
            let mut worker = (self.factory)(endpoint);
            if let Err(e) = worker.start() {
                error!(endpoint = %endpoint, error = %e, "Process worker failed to start");
                for slot in &started {
                    slot.worker.lock().shutdown();
                }
                return Err(PoolError::WorkerStart {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                });
            }
            debug!(endpoint = %endpoint, "Process worker started");
            started.push(WorkerSlot {
                endpoint: endpoint.clone(),
                worker: Mutex::new(worker),
            });
        }

        let (available_tx, available_rx) = bounded(started.len());
        for idx in 0..started.len() {
            available_tx
                .try_send(idx)
                .map_err(|e| PoolError::Internal(format!("availability queue: {e}")))?;
        }
        let (closed_tx, closed_rx) = bounded(0);

        let worker_count = started.len();
        *self.active.write() = Some(Arc::new(Generation {
            workers: started,
            available_tx,
            available_rx,
            closed_tx: Mutex::new(Some(closed_tx)),
            closed_rx,
            acquire_timeout: config.acquire_timeout(),
            running: AtomicBool::new(true),
        }));

        info!(
            worker_count,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "Process worker pool started"
        );
        Ok(())
    }

    /// Run `task` on an idle worker, waiting up to the acquisition timeout.
    ///
    /// The worker goes back to the availability queue however the task ends.
    /// A worker whose session ended is restarted before it is used again.
    ///
    /// # Errors
    ///
    /// - `PoolError::Disabled` if the pool was started with a disabled config
    /// - `PoolError::NotRunning` if the pool is not running
    /// - `PoolError::Unavailable` if no worker was released in time
    /// - `PoolError::Task` if the task failed on the worker, or a dead worker
    ///   could not be restarted
    pub fn execute(&self, task: W::Task) -> Result<W::Output, PoolError> {
        let generation = self.current()?;

        let idx = select! {
            recv(generation.available_rx) -> idx => idx.map_err(|_| PoolError::NotRunning)?,
            recv(generation.closed_rx) -> _ => return Err(PoolError::NotRunning),
            default(generation.acquire_timeout) => {
                warn!(
                    timeout_ms = generation.acquire_timeout.as_millis(),
                    "No process worker available within timeout"
                );
                return Err(PoolError::Unavailable {
                    timeout: generation.acquire_timeout,
                });
            }
        };
        let checkout = Checkout {
            generation: &*generation,
            idx,
        };
        if !generation.running.load(Ordering::Acquire) {
            return Err(PoolError::NotRunning);
        }

        let slot = &generation.workers[checkout.idx];
        debug!(worker = idx, endpoint = %slot.endpoint, "Process worker acquired");
        let result = {
            let mut worker = slot.worker.lock();
            // Shutdown may have taken this worker's lock first.
            if !generation.running.load(Ordering::Acquire) {
                return Err(PoolError::NotRunning);
            }
            if !worker.is_running() {
                revive(&mut *worker, &slot.endpoint).map_err(PoolError::Task)?;
            }
            let result = worker.execute(task);
            if !worker.is_running() && generation.running.load(Ordering::Acquire) {
                // Session died during the task; bring it back before release.
                let _ = revive(&mut *worker, &slot.endpoint);
            }
            result
        };
        drop(checkout);

        result.map_err(|e| {
            warn!(worker = idx, endpoint = %slot.endpoint, error = %e, "Task failed on process worker");
            PoolError::Task(e)
        })
    }

    fn current(&self) -> Result<Arc<Generation<W>>, PoolError> {
        if let Some(generation) = self.active.read().as_ref() {
            return Ok(Arc::clone(generation));
        }
        if self.enabled.load(Ordering::Acquire) {
            Err(PoolError::NotRunning)
        } else {
            Err(PoolError::Disabled)
        }
    }

    /// Mark the pool stopped, drain the availability queue and shut down
    /// every worker.
    ///
    /// A worker still executing a task is shut down once that task releases it.
    pub fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock();
        self.shutdown_locked();
    }

    fn shutdown_locked(&self) {
        let Some(generation) = self.active.write().take() else {
            debug!("Process worker pool not running, nothing to shut down");
            return;
        };

        generation.running.store(false, Ordering::Release);
        generation.closed_tx.lock().take();
        let drained = generation.available_rx.try_iter().count();

        for slot in &generation.workers {
            slot.worker.lock().shutdown();
            debug!(endpoint = %slot.endpoint, "Process worker shut down");
        }
        info!(
            worker_count = generation.workers.len(),
            idle = drained,
            "Process worker pool shut down"
        );
    }

    /// Shut down, then start again with `config`, as one serialized step.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn restart(&self, config: &ProcessPoolConfig) -> Result<(), PoolError> {
        let _lifecycle = self.lifecycle.lock();
        info!("Restarting process worker pool");
        self.shutdown_locked();
        self.start_locked(config)
    }

    /// Whether workers are started and accepting tasks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.read().is_some()
    }

    /// Whether the last applied configuration enabled the pool.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Workers currently idle in the availability queue.
    #[must_use]
    pub fn available_workers(&self) -> usize {
        self.active
            .read()
            .as_ref()
            .map_or(0, |g| g.available_rx.len())
    }

    /// Workers constructed by the current start.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.active.read().as_ref().map_or(0, |g| g.workers.len())
    }
}

/// Restart a worker whose session ended while it belonged to a running pool.
fn revive<W: ProcessWorker>(worker: &mut W, endpoint: &str) -> Result<(), WorkerError> {
    warn!(endpoint = %endpoint, "Process worker session lost, restarting");
    worker.start().map_err(|e| {
        error!(endpoint = %endpoint, error = %e, "Process worker restart failed");
        e
    })
}

impl<W: ProcessWorker> Drop for ProcessWorkerPool<W> {
    fn drop(&mut self) {
        self.shutdown_locked();
    }
}
