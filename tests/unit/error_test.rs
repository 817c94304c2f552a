//! Tests for error types

use std::time::Duration;

use prometheus_task_pool::core::{FaultKind, JobCancelled, PoolError, WorkerError};

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("max_workers must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: max_workers must be greater than 0"
    );
    assert_eq!(err.fault_kind(), FaultKind::Configuration);
}

#[test]
fn test_worker_start_error() {
    let err = PoolError::WorkerStart {
        endpoint: "soffice --port 2002".to_string(),
        reason: "connection refused".to_string(),
    };
    assert_eq!(
        format!("{err}"),
        "worker `soffice --port 2002` failed to start: connection refused"
    );
    assert_eq!(err.fault_kind(), FaultKind::Configuration);
}

#[test]
fn test_unavailable_error() {
    let err = PoolError::Unavailable {
        timeout: Duration::from_secs(30),
    };
    assert_eq!(format!("{err}"), "no worker available within 30s");
    assert_eq!(err.fault_kind(), FaultKind::Unavailable);
}

#[test]
fn test_disabled_and_not_running_errors() {
    assert_eq!(format!("{}", PoolError::Disabled), "pool is disabled");
    assert_eq!(format!("{}", PoolError::NotRunning), "pool is not running");
}

#[test]
fn test_task_error_wraps_worker_error() {
    let err: PoolError = WorkerError::Failed("bad input".to_string()).into();
    assert_eq!(format!("{err}"), "task failed: task failed: bad input");
    assert_eq!(err.fault_kind(), FaultKind::Execution);
}

#[test]
fn test_job_cancelled_downcasts_from_anyhow() {
    let err: anyhow::Error = JobCancelled.into();
    assert!(err.is::<JobCancelled>());
    assert_eq!(err.to_string(), "job stopped on request");
}
