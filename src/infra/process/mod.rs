//! Process worker implementations backed by OS subprocesses.

pub mod command;

pub use command::CommandWorker;
