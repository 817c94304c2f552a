//! Tests for the tokio bridge

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_task_pool::config::{ProcessPoolConfig, TaskPoolConfig};
use prometheus_task_pool::core::{
    Job, JobInfo, PoolError, PriorityTaskPool, ProcessWorker, ProcessWorkerPool, WorkerError,
};
use prometheus_task_pool::runtime::{await_termination_async, execute_async, shutdown_async};

struct Doubler;

impl ProcessWorker for Doubler {
    type Task = u64;
    type Output = u64;

    fn start(&mut self) -> Result<(), WorkerError> {
        Ok(())
    }

    fn execute(&mut self, task: u64) -> Result<u64, WorkerError> {
        std::thread::sleep(Duration::from_millis(20));
        Ok(task * 2)
    }

    fn shutdown(&mut self) {}

    fn is_running(&self) -> bool {
        true
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_execute_async() {
    let pool = Arc::new(ProcessWorkerPool::new(|_: &str| Doubler));
    pool.start(&ProcessPoolConfig::new(["one", "two"])).unwrap();

    let a = tokio::spawn(execute_async(Arc::clone(&pool), 21));
    let b = tokio::spawn(execute_async(Arc::clone(&pool), 50));
    assert_eq!(a.await.unwrap().unwrap(), 42);
    assert_eq!(b.await.unwrap().unwrap(), 100);
    pool.shutdown();
}

#[tokio::test]
async fn test_execute_async_not_running() {
    let pool = Arc::new(ProcessWorkerPool::new(|_: &str| Doubler));
    let result = execute_async(pool, 1).await;
    assert!(matches!(result, Err(PoolError::NotRunning)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_async_waits_for_jobs() {
    let pool = Arc::new(PriorityTaskPool::new(TaskPoolConfig::new().with_worker_count(1)).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    pool.submit(Job::new(JobInfo::new("async-job", 0), move |_| {
        std::thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }));

    assert!(!await_termination_async(Arc::clone(&pool), Duration::from_millis(5))
        .await
        .unwrap());
    shutdown_async(Arc::clone(&pool)).await.unwrap();
    assert!(done.load(Ordering::SeqCst));
    assert!(pool.is_terminated());
}
