//! Infrastructure adapters: the in-memory priority queue and process-backed workers.

pub mod process;
pub mod queue;

pub use process::CommandWorker;
pub use queue::PriorityJobQueue;
