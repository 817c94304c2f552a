//! Jobs, their identity, and the cooperative stop protocol.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::JobCancelled;

/// Opaque job identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create an identity from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random (UUID v4) identity.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Immutable description of a job.
///
/// Lower `priority` values are served first; equal priorities are served in
/// submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job identity used for lookup and cancellation.
    pub id: JobId,
    /// Priority rank (lower runs first).
    pub priority: i32,
    /// Input the job body works on, if any.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Free-form labels carried along for logging and audit.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl JobInfo {
    /// Create job info with the given identity and priority.
    pub fn new(id: impl Into<JobId>, priority: i32) -> Self {
        Self {
            id: id.into(),
            priority,
            input: None,
            labels: BTreeMap::new(),
        }
    }

    /// Attach an input reference.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Attach a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Shared stop flag for one job.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// Create an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` only for the call that set the flag.
    pub fn request(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Execution context handed to a job body.
#[derive(Debug)]
pub struct JobContext {
    info: Arc<JobInfo>,
    stop: StopToken,
}

impl JobContext {
    pub(crate) const fn new(info: Arc<JobInfo>, stop: StopToken) -> Self {
        Self { info, stop }
    }

    /// The job being executed.
    #[must_use]
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    /// Whether a stop has been requested for this job.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    /// Safe point: fails with [`JobCancelled`] once a stop was requested.
    ///
    /// Bodies call this between units of work and propagate with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`JobCancelled`] if the job has been asked to stop.
    pub fn checkpoint(&self) -> Result<(), JobCancelled> {
        if self.stop.is_requested() {
            Err(JobCancelled)
        } else {
            Ok(())
        }
    }
}

/// Execution body of a job.
///
/// Implemented for every `FnOnce(&JobContext) -> anyhow::Result<()>` closure.
pub trait JobBody: Send + 'static {
    /// Run the job to completion or until it observes a stop request.
    ///
    /// # Errors
    ///
    /// Any error is logged by the pool and counted against this job only.
    fn run(self: Box<Self>, ctx: &JobContext) -> anyhow::Result<()>;
}

impl<F> JobBody for F
where
    F: FnOnce(&JobContext) -> anyhow::Result<()> + Send + 'static,
{
    fn run(self: Box<Self>, ctx: &JobContext) -> anyhow::Result<()> {
        (*self)(ctx)
    }
}

/// A schedulable job: info, body and stop flag.
pub struct Job {
    pub(crate) info: Arc<JobInfo>,
    pub(crate) body: Box<dyn JobBody>,
    pub(crate) stop: StopToken,
}

impl Job {
    /// Create a job from its info and a closure body.
    pub fn new<F>(info: JobInfo, body: F) -> Self
    where
        F: FnOnce(&JobContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::with_body(info, body)
    }

    /// Create a job from its info and any [`JobBody`] implementor.
    pub fn with_body(info: JobInfo, body: impl JobBody) -> Self {
        Self {
            info: Arc::new(info),
            body: Box::new(body),
            stop: StopToken::new(),
        }
    }

    /// The job's info.
    #[must_use]
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    /// The job's identity.
    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.info.id
    }

    /// The stop token shared with the body's context.
    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Run the body on the current thread.
    pub(crate) fn run(self) -> anyhow::Result<()> {
        let ctx = JobContext::new(self.info, self.stop);
        self.body.run(&ctx)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("info", &self.info)
            .field("stop_requested", &self.stop.is_requested())
            .finish_non_exhaustive()
    }
}

/// Outcome of one job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The body returned successfully.
    Completed,
    /// The job was stopped on request (queued or running).
    Cancelled,
    /// The body returned an error or panicked.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_token_sets_once() {
        let token = StopToken::new();
        let other = token.clone();
        assert!(!other.is_requested());
        assert!(token.request());
        assert!(!other.request());
        assert!(other.is_requested());
    }

    #[test]
    fn test_checkpoint_after_stop() {
        let stop = StopToken::new();
        let ctx = JobContext::new(Arc::new(JobInfo::new("a", 1)), stop.clone());
        assert!(ctx.checkpoint().is_ok());
        stop.request();
        assert_eq!(ctx.checkpoint(), Err(JobCancelled));
    }

    #[test]
    fn test_closure_body_runs_with_context() {
        let job = Job::new(JobInfo::new("pdf-1", 2).with_input("/tmp/in.pdf"), |ctx| {
            anyhow::ensure!(ctx.info().input.is_some(), "missing input");
            Ok(())
        });
        assert_eq!(job.id().as_str(), "pdf-1");
        assert!(job.run().is_ok());
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(JobId::random(), JobId::random());
    }

    #[test]
    fn test_job_info_json() {
        let info: JobInfo = serde_json::from_str(r#"{"id":"x","priority":3}"#).unwrap();
        assert_eq!(info, JobInfo::new("x", 3));
    }
}
