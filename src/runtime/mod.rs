//! Runtime adapters for calling the blocking pool APIs from async code.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_bridge;

#[cfg(feature = "tokio-runtime")]
pub use tokio_bridge::{await_termination_async, execute_async, shutdown_async};
