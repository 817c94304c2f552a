//! Tests for builder modules

use std::time::Duration;

use prometheus_task_pool::builders::build_pools;
use prometheus_task_pool::config::{PoolsConfig, ProcessPoolConfig, TaskPoolConfig};
use prometheus_task_pool::core::{Job, JobInfo, PoolError, ProcessWorker, WorkerError};

struct Reverse {
    running: bool,
}

impl ProcessWorker for Reverse {
    type Task = String;
    type Output = String;

    fn start(&mut self) -> Result<(), WorkerError> {
        self.running = true;
        Ok(())
    }

    fn execute(&mut self, task: String) -> Result<String, WorkerError> {
        Ok(task.chars().rev().collect())
    }

    fn shutdown(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

fn reverse(_endpoint: &str) -> Reverse {
    Reverse { running: false }
}

#[test]
fn test_build_pools_starts_both() {
    let cfg = PoolsConfig {
        task_pool: TaskPoolConfig::new().with_name("builder").with_worker_count(1),
        process_pool: ProcessPoolConfig::new(["a", "b"]).with_acquire_timeout(Duration::from_secs(1)),
    };

    let pools = build_pools(&cfg, reverse).unwrap();
    assert_eq!(pools.process_pool.worker_count(), 2);
    assert_eq!(pools.process_pool.execute("abc".into()).unwrap(), "cba");

    pools.task_pool.submit(Job::new(JobInfo::new("noop", 0), |_| Ok(())));
    pools.shutdown();
    assert!(pools.task_pool.is_terminated());
    assert!(!pools.process_pool.is_running());
}

#[test]
fn test_build_pools_with_default_config_disables_process_pool() {
    let pools = build_pools(&PoolsConfig::default(), reverse).unwrap();
    assert!(!pools.process_pool.is_enabled());
    assert!(matches!(
        pools.process_pool.execute("x".into()),
        Err(PoolError::Disabled)
    ));
    pools.shutdown();
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let cfg = PoolsConfig {
        task_pool: TaskPoolConfig::new().with_max_queue_depth(0),
        ..PoolsConfig::default()
    };
    let err = build_pools(&cfg, reverse).err().unwrap();
    assert!(matches!(err, PoolError::InvalidConfig(ref m) if m.contains("task_pool")));
}
