//! Heavyweight workers wrapping a long-lived external process or session.

use crate::core::WorkerError;

/// A stateful worker owning one external session.
///
/// State machine: stopped → [`start`](Self::start) → running →
/// [`shutdown`](Self::shutdown) → stopped. [`execute`](Self::execute) is only
/// valid while running.
///
/// # Example
///
/// ```rust
/// use prometheus_task_pool::core::{ProcessWorker, WorkerError};
///
/// struct Upper {
///     running: bool,
/// }
///
/// impl ProcessWorker for Upper {
///     type Task = String;
///     type Output = String;
///
///     fn start(&mut self) -> Result<(), WorkerError> {
///         self.running = true;
///         Ok(())
///     }
///
///     fn execute(&mut self, task: String) -> Result<String, WorkerError> {
///         if !self.running {
///             return Err(WorkerError::NotRunning);
///         }
///         Ok(task.to_uppercase())
///     }
///
///     fn shutdown(&mut self) {
///         self.running = false;
///     }
///
///     fn is_running(&self) -> bool {
///         self.running
///     }
/// }
/// ```
pub trait ProcessWorker: Send + 'static {
    /// Unit of work sent to the session.
    type Task;
    /// Result produced by the session.
    type Output;

    /// Bring the session up. Called once per worker lifetime before first use.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if the process cannot be launched or connected.
    fn start(&mut self) -> Result<(), WorkerError>;

    /// Run one task synchronously against the live session.
    ///
    /// # Errors
    ///
    /// - `WorkerError::NotRunning` if the session is not running
    /// - any other `WorkerError` if communication or the task fails
    fn execute(&mut self, task: Self::Task) -> Result<Self::Output, WorkerError>;

    /// Tear the session down. Safe to call when never started or already stopped.
    fn shutdown(&mut self);

    /// Whether the session is running.
    fn is_running(&self) -> bool;
}
