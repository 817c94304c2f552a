//! Core pool abstractions: jobs, the job registry, the priority task pool and
//! the process worker pool.

pub mod audit;
pub mod error;
pub mod job;
pub mod process_pool;
pub mod process_worker;
pub mod registry;
pub mod task_pool;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, JobAction};
pub use error::{FaultKind, JobCancelled, PoolError, WorkerError};
pub use job::{Job, JobBody, JobContext, JobId, JobInfo, JobOutcome, StopToken};
pub use process_pool::ProcessWorkerPool;
pub use process_worker::ProcessWorker;
pub use registry::{JobHandle, JobRegistry, JobState};
pub use task_pool::{LogAndDrop, PoolStats, PriorityTaskPool, RejectReason, RejectionHandler};
