//! # Prometheus Task Pool
//!
//! Two complementary execution pools for long-running, expensive work.
//!
//! - [`PriorityTaskPool`](core::PriorityTaskPool): an elastic pool of OS
//!   threads running in-process jobs in priority order, with a global
//!   pause/resume gate and per-job cooperative cancellation by identity.
//! - [`ProcessWorkerPool`](core::ProcessWorkerPool): a fixed set of stateful
//!   workers, each wrapping a long-lived external process, handed out one
//!   task at a time with a bounded wait for availability.
//!
//! ## Task pool
//!
//! ```rust,no_run
//! use prometheus_task_pool::config::TaskPoolConfig;
//! use prometheus_task_pool::core::{Job, JobInfo, PriorityTaskPool};
//!
//! let pool = PriorityTaskPool::new(TaskPoolConfig::new().with_worker_count(4))?;
//!
//! // Lower rank runs first.
//! pool.submit(Job::new(JobInfo::new("thumbnail", 5), |_ctx| Ok(())));
//! pool.submit(Job::new(JobInfo::new("user-export", 1), |ctx| {
//!     for _chunk in 0..64 {
//!         ctx.checkpoint()?;
//!     }
//!     Ok(())
//! }));
//!
//! pool.pause();
//! pool.cancel(&"thumbnail".into());
//! pool.resume();
//! pool.shutdown();
//! # Ok::<(), prometheus_task_pool::core::PoolError>(())
//! ```
//!
//! ## Process worker pool
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use prometheus_task_pool::config::ProcessPoolConfig;
//! use prometheus_task_pool::core::ProcessWorkerPool;
//! use prometheus_task_pool::infra::CommandWorker;
//!
//! let pool = ProcessWorkerPool::new(CommandWorker::new);
//! pool.start(
//!     &ProcessPoolConfig::new(["worker --port 8100", "worker --port 8101"])
//!         .with_acquire_timeout(Duration::from_secs(5)),
//! )?;
//! let answer = pool.execute("convert /tmp/in.odt".to_string())?;
//! println!("{answer}");
//! pool.shutdown();
//! # Ok::<(), prometheus_task_pool::core::PoolError>(())
//! ```
//!
//! ## Configuration
//!
//! Both pools are configured through serde structs that can be loaded from
//! JSON or from `TASK_POOL_*` / `PROCESS_POOL_*` environment variables (with
//! `.env` support); see [`config`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod builders;
pub mod config;
pub mod core;
pub mod infra;
pub mod runtime;
pub mod util;

