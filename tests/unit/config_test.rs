//! Tests for configuration validation

use std::time::Duration;

use prometheus_task_pool::config::{PoolsConfig, ProcessPoolConfig, TaskPoolConfig};

#[test]
fn test_task_pool_config_validation() {
    let valid = TaskPoolConfig::new().with_min_workers(2).with_max_workers(8);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_task_pool_config_invalid_max_workers() {
    let invalid = TaskPoolConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_task_pool_config_invalid_queue_depth() {
    let invalid = TaskPoolConfig::new().with_max_queue_depth(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_task_pool_config_invalid_idle_timeout() {
    let invalid = TaskPoolConfig::new().with_idle_timeout(Duration::ZERO);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_process_pool_config_validation() {
    let valid = ProcessPoolConfig::new(["soffice --port 2002", "soffice --port 2003"]);
    assert!(valid.validate().is_ok());
    assert_eq!(valid.acquire_timeout(), Duration::from_secs(30));
}

#[test]
fn test_process_pool_config_rejects_bad_endpoints() {
    assert!(ProcessPoolConfig::new(Vec::<String>::new()).validate().is_err());
    assert!(ProcessPoolConfig::new(["a", "  "]).validate().is_err());
    assert!(ProcessPoolConfig::new(["a", "a"]).validate().is_err());
    assert!(ProcessPoolConfig::new(["a"])
        .with_acquire_timeout(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_disabled_process_pool_needs_no_endpoints() {
    assert!(ProcessPoolConfig::disabled().validate().is_ok());
}

#[test]
fn test_pools_config_from_json() {
    let json = r#"{
        "task_pool": {
            "name": "converter",
            "min_workers": 1,
            "max_workers": 3,
            "idle_timeout_ms": 5000
        },
        "process_pool": {
            "endpoints": ["worker --port 8100", "worker --port 8101"],
            "acquire_timeout_ms": 1000
        }
    }"#;

    let config = PoolsConfig::from_json_str(json).unwrap();
    assert_eq!(config.task_pool.name, "converter");
    assert_eq!(config.task_pool.max_workers, 3);
    assert_eq!(config.task_pool.max_queue_depth, 10_000);
    assert!(config.process_pool.enabled);
    assert_eq!(config.process_pool.endpoints.len(), 2);
    assert_eq!(config.process_pool.acquire_timeout(), Duration::from_secs(1));
}

#[test]
fn test_pools_config_from_json_without_process_pool() {
    let config = PoolsConfig::from_json_str(r#"{ "task_pool": { "max_workers": 2 } }"#).unwrap();
    assert!(!config.process_pool.enabled);
}

#[test]
fn test_pools_config_from_json_rejects_invalid() {
    let err = PoolsConfig::from_json_str(r#"{ "task_pool": { "max_workers": 0 } }"#).unwrap_err();
    assert!(err.contains("task_pool"));

    let err = PoolsConfig::from_json_str("not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_process_pool_config_from_lookup() {
    let cfg = ProcessPoolConfig::from_lookup(|key| match key {
        "PROCESS_POOL_ENDPOINTS" => Some("cat; cat -u ;".to_string()),
        "PROCESS_POOL_ACQUIRE_TIMEOUT_MS" => Some("250".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.endpoints, vec!["cat", "cat -u"]);
    assert_eq!(cfg.acquire_timeout(), Duration::from_millis(250));
}

#[test]
fn test_task_pool_config_from_lookup_reports_bad_value() {
    let err = TaskPoolConfig::from_lookup(|key| {
        (key == "TASK_POOL_MAX_WORKERS").then(|| "many".to_string())
    })
    .unwrap_err();
    assert!(err.contains("TASK_POOL_MAX_WORKERS"));
}
