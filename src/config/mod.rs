//! Configuration models for the task pool and the process worker pool.

pub mod pool;

pub use pool::{PoolsConfig, ProcessPoolConfig, TaskPoolConfig};
