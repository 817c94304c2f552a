//! Priority-ordered thread pool with pause/resume and per-job cancellation.
//!
//! Jobs are dequeued by ascending priority rank, FIFO among equal ranks, and
//! run on dedicated OS threads. Between `min_workers` and `max_workers`
//! threads are alive at any time; threads above the minimum retire after the
//! configured idle timeout.
//!
//! # Example
//!
//! ```rust,no_run
//! use prometheus_task_pool::config::TaskPoolConfig;
//! use prometheus_task_pool::core::{Job, JobInfo, PriorityTaskPool};
//!
//! let pool = PriorityTaskPool::new(TaskPoolConfig::new().with_worker_count(2))?;
//!
//! pool.submit(Job::new(JobInfo::new("optimize-42", 1), |ctx| {
//!     for _page in 0..100 {
//!         ctx.checkpoint()?;
//!         // rewrite one page...
//!     }
//!     Ok(())
//! }));
//!
//! assert!(pool.cancel(&"optimize-42".into()) || !pool.contains(&"optimize-42".into()));
//! pool.shutdown();
//! # Ok::<(), prometheus_task_pool::core::PoolError>(())
//! ```

mod worker;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::TaskPoolConfig;
use crate::core::audit::{build_audit_event, AuditSink, JobAction};
use crate::core::{Job, JobHandle, JobId, JobInfo, JobOutcome, JobRegistry, JobState, PoolError};
use crate::infra::queue::PriorityJobQueue;

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The pool has been shut down.
    Shutdown,
    /// The queue reached its configured depth.
    QueueFull {
        /// Configured maximum depth.
        depth: usize,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "pool is shut down"),
            Self::QueueFull { depth } => write!(f, "queue is full ({depth} jobs)"),
        }
    }
}

/// Policy hook for submissions the pool cannot accept.
///
/// Submission is fire-and-forget, so the handler is the only party that sees
/// a rejected job.
pub trait RejectionHandler: Send + Sync {
    /// Take ownership of a rejected job.
    fn rejected(&self, job: Job, reason: RejectReason);
}

impl<F> RejectionHandler for F
where
    F: Fn(Job, RejectReason) + Send + Sync,
{
    fn rejected(&self, job: Job, reason: RejectReason) {
        self(job, reason);
    }
}

/// Default rejection policy: log and drop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndDrop;

impl RejectionHandler for LogAndDrop {
    fn rejected(&self, job: Job, reason: RejectReason) {
        warn!(job_id = %job.id(), priority = job.info().priority, %reason, "Job rejected, dropping");
    }
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Live worker threads.
    pub workers: usize,
    /// Worker threads waiting for work.
    pub idle_workers: usize,
    /// Jobs currently executing.
    pub active_jobs: u64,
    /// Jobs waiting in the queue.
    pub queued_jobs: usize,
    /// Jobs accepted into the queue.
    pub submitted_jobs: u64,
    /// Jobs whose body returned successfully.
    pub completed_jobs: u64,
    /// Jobs whose body failed or panicked.
    pub failed_jobs: u64,
    /// Jobs stopped on request, queued or running.
    pub cancelled_jobs: u64,
    /// Submissions handed to the rejection handler.
    pub rejected_jobs: u64,
    /// Whether the pool is paused.
    pub paused: bool,
    /// Whether the pool still accepts submissions.
    pub accepting: bool,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active: AtomicU64,
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
    pub rejected: AtomicU64,
}

impl PoolCounters {
    pub fn record(&self, outcome: &JobOutcome) {
        let counter = match outcome {
            JobOutcome::Completed => &self.completed,
            JobOutcome::Cancelled => &self.cancelled,
            JobOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Mutable pool state, guarded by one lock shared with the wake condvar.
pub(crate) struct PoolState {
    pub queue: PriorityJobQueue,
    /// Accepting submissions.
    pub running: bool,
    pub paused: bool,
    pub workers: usize,
    pub idle: usize,
    /// Spawned threads that have not taken the lock yet.
    pub starting: usize,
    pub next_worker_id: usize,
}

impl PoolState {
    const fn is_terminated(&self) -> bool {
        !self.running && self.workers == 0
    }
}

/// State shared between the pool handle and its worker threads.
pub(crate) struct Shared {
    pub config: TaskPoolConfig,
    pub state: Mutex<PoolState>,
    /// Signaled on submit, resume and shutdown.
    pub work_available: Condvar,
    /// Signaled whenever a worker thread exits.
    pub worker_exited: Condvar,
    pub registry: JobRegistry,
    pub counters: PoolCounters,
    pub audit: RwLock<Option<Arc<dyn AuditSink>>>,
    pub handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    pub fn record(&self, info: &JobInfo, action: JobAction) {
        if let Some(sink) = self.audit.read().as_ref() {
            sink.record(build_audit_event(&info.id, info.priority, &self.config.name, action));
        }
    }

    /// Spawn one worker thread. Caller holds the state lock.
    pub fn spawn_worker(self: &Arc<Self>, state: &mut PoolState) -> Result<(), PoolError> {
        let worker_id = state.next_worker_id;
        let shared = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("{}-worker-{worker_id}", self.config.name))
            .stack_size(self.config.thread_stack_size)
            .spawn(move || worker::run_worker(&shared, worker_id))
            .map_err(|e| PoolError::Internal(format!("failed to spawn worker thread: {e}")))?;

        state.next_worker_id += 1;
        state.workers += 1;
        state.starting += 1;
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(())
    }

    /// Spawn workers until queued jobs have an idle worker each or the cap is hit.
    fn grow(self: &Arc<Self>, state: &mut PoolState) {
        while !state.paused
            && state.idle + state.starting < state.queue.len()
            && state.workers < self.config.max_workers
        {
            if let Err(e) = self.spawn_worker(state) {
                warn!(error = %e, workers = state.workers, "Could not grow task pool");
                break;
            }
        }
    }

    /// Finalize a job that was taken out of the queue before it ran.
    fn cancel_queued(&self, ticket: u64, job: &Job) {
        if let Some(handle) = self.registry.unregister(job.id(), ticket) {
            handle.request_stop();
            handle.set_state(JobState::Cancelled);
        }
        self.counters.record(&JobOutcome::Cancelled);
        self.record(job.info(), JobAction::Finished(JobOutcome::Cancelled));
    }
}

/// Priority-ordered worker pool.
///
/// See the [module documentation](self) for an overview.
pub struct PriorityTaskPool {
    shared: Arc<Shared>,
    rejection: RwLock<Arc<dyn RejectionHandler>>,
    next_ticket: AtomicU64,
}

impl PriorityTaskPool {
    /// Create a pool and spawn its `min_workers` threads.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Internal` if a worker thread cannot be spawned
    pub fn new(config: TaskPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: PriorityJobQueue::new(config.max_queue_depth),
                running: true,
                paused: false,
                workers: 0,
                idle: 0,
                starting: 0,
                next_worker_id: 0,
            }),
            work_available: Condvar::new(),
            worker_exited: Condvar::new(),
            registry: JobRegistry::new(),
            counters: PoolCounters::default(),
            audit: RwLock::new(None),
            handles: Mutex::new(Vec::with_capacity(config.max_workers)),
            config,
        });

        {
            let mut state = shared.state.lock();
            for _ in 0..shared.config.min_workers {
                if let Err(e) = shared.spawn_worker(&mut state) {
                    state.running = false;
                    drop(state);
                    shared.work_available.notify_all();
                    return Err(e);
                }
            }
        }

        info!(
            pool = %shared.config.name,
            min_workers = shared.config.min_workers,
            max_workers = shared.config.max_workers,
            max_queue_depth = shared.config.max_queue_depth,
            "PriorityTaskPool initialized"
        );

        Ok(Self {
            shared,
            rejection: RwLock::new(Arc::new(LogAndDrop)),
            next_ticket: AtomicU64::new(0),
        })
    }

    /// Replace the rejection policy.
    #[must_use]
    pub fn with_rejection_handler(self, handler: impl RejectionHandler + 'static) -> Self {
        *self.rejection.write() = Arc::new(handler);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, sink: Arc<dyn AuditSink>) -> Self {
        *self.shared.audit.write() = Some(sink);
        self
    }

    /// Queue a job and return immediately.
    ///
    /// The job is registered before any worker can see it, so a `cancel`
    /// issued right after `submit` always finds it. Jobs the pool cannot
    /// accept go to the rejection handler.
    pub fn submit(&self, job: Job) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let shared = &self.shared;

        let mut state = shared.state.lock();
        if !state.running {
            drop(state);
            self.reject(job, RejectReason::Shutdown);
            return;
        }

        let info = Arc::clone(&job.info);
        shared.registry.register(&job, ticket);
        if let Err(job) = state.queue.push(ticket, job) {
            shared.registry.unregister(&info.id, ticket);
            let depth = state.queue.max_depth();
            drop(state);
            self.reject(job, RejectReason::QueueFull { depth });
            return;
        }

        shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        shared.grow(&mut state);
        drop(state);
        shared.work_available.notify_one();

        debug!(job_id = %info.id, priority = info.priority, ticket, "Job submitted to task pool");
        shared.record(&info, JobAction::Submitted);
    }

    fn reject(&self, job: Job, reason: RejectReason) {
        self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
        self.shared.record(job.info(), JobAction::Rejected);
        let handler = self.rejection.read().clone();
        handler.rejected(job, reason);
    }

    /// Stop workers from starting new jobs. Running jobs are not affected.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        if state.running && !state.paused {
            state.paused = true;
            info!(pool = %self.shared.config.name, "Task pool paused");
        }
    }

    /// Let workers start jobs again, waking every waiting worker.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock();
        if state.paused {
            state.paused = false;
            self.shared.grow(&mut state);
            info!(pool = %self.shared.config.name, queued = state.queue.len(), "Task pool resumed");
        }
        drop(state);
        self.shared.work_available.notify_all();
    }

    /// Whether the pool is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    /// Stop the job with identity `id`.
    ///
    /// A queued job is removed and never runs. A running job gets its stop
    /// flag set and this returns without waiting for the body to exit.
    /// Returns `false` if no such job is queued or running.
    pub fn cancel(&self, id: &JobId) -> bool {
        let shared = &self.shared;
        let Some(handle) = shared.registry.find(id) else {
            debug!(job_id = %id, "Cancel requested for unknown job");
            return false;
        };

        let mut state = shared.state.lock();
        if let Some(job) = state.queue.remove(handle.ticket()) {
            drop(state);
            shared.cancel_queued(handle.ticket(), &job);
            info!(job_id = %id, "Queued job cancelled before start");
            return true;
        }
        let job_state = handle.state();
        drop(state);

        if job_state == JobState::Running {
            if handle.request_stop() {
                info!(job_id = %id, "Stop requested for running job");
            }
            true
        } else {
            false
        }
    }

    /// Whether a job with identity `id` is queued or running.
    #[must_use]
    pub fn contains(&self, id: &JobId) -> bool {
        self.shared.registry.find(id).is_some()
    }

    /// Registry view of the oldest live job with identity `id`.
    #[must_use]
    pub fn job(&self, id: &JobId) -> Option<Arc<JobHandle>> {
        self.shared.registry.find(id)
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        let state = self.shared.state.lock();
        PoolStats {
            workers: state.workers,
            idle_workers: state.idle,
            active_jobs: counters.active.load(Ordering::Relaxed),
            queued_jobs: state.queue.len(),
            submitted_jobs: counters.submitted.load(Ordering::Relaxed),
            completed_jobs: counters.completed.load(Ordering::Relaxed),
            failed_jobs: counters.failed.load(Ordering::Relaxed),
            cancelled_jobs: counters.cancelled.load(Ordering::Relaxed),
            rejected_jobs: counters.rejected.load(Ordering::Relaxed),
            paused: state.paused,
            accepting: state.running,
        }
    }

    /// Whether `shutdown` or `shutdown_now` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        !self.shared.state.lock().running
    }

    /// Whether the pool is shut down and every worker has exited.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.state.lock().is_terminated()
    }

    /// Block until the pool terminates or `timeout` elapses.
    ///
    /// Returns whether the pool terminated.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.is_terminated() {
            if self
                .shared
                .worker_exited
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.is_terminated();
            }
        }
        true
    }

    /// Stop accepting jobs, let queued and running jobs finish, and wait for
    /// every worker to exit.
    ///
    /// A paused pool is resumed so its queue can drain. Must not be called
    /// from inside a job body.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.running {
                state.running = false;
                state.paused = false;
                // Queued jobs still need a thread each when min_workers is 0.
                self.shared.grow(&mut state);
                info!(
                    pool = %self.shared.config.name,
                    queued = state.queue.len(),
                    "Shutting down task pool"
                );
            }
        }
        self.shared.work_available.notify_all();
        self.wait_for_workers();
    }

    /// Stop accepting jobs, drop every queued job, request a stop on every
    /// running job, and wait for every worker to exit.
    ///
    /// Returns the info of the jobs that never ran.
    pub fn shutdown_now(&self) -> Vec<JobInfo> {
        let drained = {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.paused = false;
            state.queue.drain()
        };
        self.shared.work_available.notify_all();

        let mut never_ran = Vec::with_capacity(drained.len());
        for (ticket, job) in drained {
            self.shared.cancel_queued(ticket, &job);
            never_ran.push(job.info().clone());
        }
        for handle in self.shared.registry.handles() {
            if handle.state() == JobState::Running && handle.request_stop() {
                debug!(job_id = %handle.info().id, "Stop requested during shutdown");
            }
        }

        info!(
            pool = %self.shared.config.name,
            dropped = never_ran.len(),
            "Task pool shutting down now"
        );
        self.wait_for_workers();
        never_ran
    }

    /// Poll for termination at the configured interval, then join threads.
    fn wait_for_workers(&self) {
        let interval = self.shared.config.shutdown_poll_interval();
        let mut polls = 0u64;
        while !self.await_termination(interval) {
            polls += 1;
            let stats = self.stats();
            debug!(
                polls,
                workers = stats.workers,
                active = stats.active_jobs,
                queued = stats.queued_jobs,
                "Waiting for task pool workers to finish"
            );
        }

        let handles: Vec<_> = self.shared.handles.lock().drain(..).collect();
        for (idx, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                warn!(worker = idx, "Worker thread panicked");
            }
        }
        info!(pool = %self.shared.config.name, "Task pool shut down complete");
    }
}

impl Drop for PriorityTaskPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join; queued jobs still drain.
        let mut state = self.shared.state.lock();
        if state.running {
            state.running = false;
            state.paused = false;
            self.shared.grow(&mut state);
            drop(state);
            self.shared.work_available.notify_all();
            debug!("PriorityTaskPool dropped without explicit shutdown - workers will be detached");
        }
    }
}
