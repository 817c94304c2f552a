//! Pool configuration structures.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default thread stack size for task pool workers (2 MiB).
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Priority task pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPoolConfig {
    /// Pool name, used for thread names and log fields.
    pub name: String,
    /// Worker threads kept alive even when idle.
    pub min_workers: usize,
    /// Upper bound on concurrently running worker threads.
    pub max_workers: usize,
    /// Idle time after which workers beyond `min_workers` retire.
    pub idle_timeout_ms: u64,
    /// Maximum queued jobs before submissions are rejected.
    pub max_queue_depth: usize,
    /// Retry interval while `shutdown` waits for workers to exit.
    pub shutdown_poll_interval_ms: u64,
    /// Stack size for worker threads.
    pub thread_stack_size: usize,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            name: "task-pool".into(),
            min_workers: 1,
            max_workers: num_cpus::get().max(1),
            idle_timeout_ms: 60_000,
            max_queue_depth: 10_000,
            shutdown_poll_interval_ms: 100,
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl TaskPoolConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set both worker bounds to `count`.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.min_workers = count;
        self.max_workers = count;
        self
    }

    /// Set the always-available worker count.
    #[must_use]
    pub fn with_min_workers(mut self, count: usize) -> Self {
        self.min_workers = count;
        self
    }

    /// Set the maximum worker count.
    #[must_use]
    pub fn with_max_workers(mut self, count: usize) -> Self {
        self.max_workers = count;
        self
    }

    /// Set the idle timeout for workers above the minimum.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the maximum queue depth.
    #[must_use]
    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Set the shutdown polling interval.
    #[must_use]
    pub fn with_shutdown_poll_interval(mut self, interval: Duration) -> Self {
        self.shutdown_poll_interval_ms = duration_ms(interval);
        self
    }

    /// Idle timeout as a duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Shutdown polling interval as a duration.
    #[must_use]
    pub const fn shutdown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_interval_ms)
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.min_workers > self.max_workers {
            return Err(format!(
                "min_workers ({}) must not exceed max_workers ({})",
                self.min_workers, self.max_workers
            ));
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.idle_timeout_ms == 0 {
            return Err("idle_timeout_ms must be greater than 0".into());
        }
        if self.shutdown_poll_interval_ms == 0 {
            return Err("shutdown_poll_interval_ms must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }

    /// Build from `TASK_POOL_*` variables, reading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build from a variable lookup function; unset variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(name) = lookup("TASK_POOL_NAME") {
            cfg.name = name;
        }
        parse_var(&lookup, "TASK_POOL_MIN_WORKERS", &mut cfg.min_workers)?;
        parse_var(&lookup, "TASK_POOL_MAX_WORKERS", &mut cfg.max_workers)?;
        parse_var(&lookup, "TASK_POOL_IDLE_TIMEOUT_MS", &mut cfg.idle_timeout_ms)?;
        parse_var(&lookup, "TASK_POOL_MAX_QUEUE_DEPTH", &mut cfg.max_queue_depth)?;
        parse_var(&lookup, "TASK_POOL_SHUTDOWN_POLL_MS", &mut cfg.shutdown_poll_interval_ms)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Process worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPoolConfig {
    /// Administrative switch; a disabled pool never starts workers.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// One endpoint descriptor per worker.
    pub endpoints: Vec<String>,
    /// Maximum wait for an idle worker.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_acquire_timeout_ms() -> u64 {
    30_000
}

impl Default for ProcessPoolConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoints: Vec::new(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl ProcessPoolConfig {
    /// Enabled configuration with the given endpoints and default timeout.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A configuration with the pool switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = duration_ms(timeout);
        self
    }

    /// Acquisition timeout as a duration.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Validate the configuration. A disabled configuration is always valid.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.endpoints.is_empty() {
            return Err("at least one endpoint must be configured".into());
        }
        if let Some(pos) = self.endpoints.iter().position(|e| e.trim().is_empty()) {
            return Err(format!("endpoint #{pos} is empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.as_str()) {
                return Err(format!("endpoint `{endpoint}` is listed more than once"));
            }
        }
        if self.acquire_timeout_ms == 0 {
            return Err("acquire_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Build from `PROCESS_POOL_*` variables, reading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build from a variable lookup function; unset variables keep defaults.
    ///
    /// `PROCESS_POOL_ENDPOINTS` is a `;`-separated list.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        parse_var(&lookup, "PROCESS_POOL_ENABLED", &mut cfg.enabled)?;
        if let Some(list) = lookup("PROCESS_POOL_ENDPOINTS") {
            cfg.endpoints = list
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        parse_var(&lookup, "PROCESS_POOL_ACQUIRE_TIMEOUT_MS", &mut cfg.acquire_timeout_ms)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Root configuration for both pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Priority task pool settings.
    #[serde(default)]
    pub task_pool: TaskPoolConfig,
    /// Process worker pool settings; disabled when omitted.
    #[serde(default = "ProcessPoolConfig::disabled")]
    pub process_pool: ProcessPoolConfig,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            task_pool: TaskPoolConfig::default(),
            process_pool: ProcessPoolConfig::disabled(),
        }
    }
}

impl PoolsConfig {
    /// Validate both pool configurations.
    ///
    /// # Errors
    ///
    /// Returns the first failure, prefixed with the pool it belongs to.
    pub fn validate(&self) -> Result<(), String> {
        self.task_pool
            .validate()
            .map_err(|e| format!("task_pool invalid: {e}"))?;
        self.process_pool
            .validate()
            .map_err(|e| format!("process_pool invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load both pool configurations from the environment and `.env`.
    ///
    /// # Errors
    ///
    /// Returns the first parse or validation message.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            task_pool: TaskPoolConfig::from_env()?,
            process_pool: ProcessPoolConfig::from_env()?,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}
