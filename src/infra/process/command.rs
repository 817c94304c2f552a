//! Line-oriented subprocess worker.
//!
//! The endpoint descriptor is a command line (program followed by
//! whitespace-separated arguments). Each task is written to the child's stdin
//! as one line; the next line on its stdout is the answer. An answer starting
//! with `ERR ` is reported as a task failure.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::{ProcessWorker, WorkerError};

const ERROR_PREFIX: &str = "ERR ";
const DEFAULT_GRACE: Duration = Duration::from_millis(500);
const EXIT_POLL: Duration = Duration::from_millis(10);

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// [`ProcessWorker`] that talks to a child process over stdin/stdout.
pub struct CommandWorker {
    endpoint: String,
    grace: Duration,
    session: Option<Session>,
}

impl CommandWorker {
    /// Worker for the given command line; nothing is spawned until `start`.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            grace: DEFAULT_GRACE,
            session: None,
        }
    }

    /// How long shutdown waits for the child to exit after closing stdin
    /// before killing it.
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// The command line this worker runs.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// OS process id of the running child.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.child.id())
    }

    fn exchange(session: &mut Session, task: &str) -> Result<String, WorkerError> {
        session.stdin.write_all(task.as_bytes())?;
        session.stdin.write_all(b"\n")?;
        session.stdin.flush()?;

        let mut line = String::new();
        if session.stdout.read_line(&mut line)? == 0 {
            return Err(WorkerError::Protocol("process closed its output".into()));
        }
        let answer = line.trim_end_matches(['\r', '\n']);
        match answer.strip_prefix(ERROR_PREFIX) {
            Some(reason) => Err(WorkerError::Failed(reason.to_string())),
            None => Ok(answer.to_string()),
        }
    }
}

impl ProcessWorker for CommandWorker {
    type Task = String;
    type Output = String;

    fn start(&mut self) -> Result<(), WorkerError> {
        if self.session.is_some() {
            return Ok(());
        }
        let mut parts = self.endpoint.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| WorkerError::Protocol("empty command line".into()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(WorkerError::Protocol("child stdio was not captured".into()));
        };

        debug!(endpoint = %self.endpoint, pid = child.id(), "Spawned worker process");
        self.session = Some(Session {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        });
        Ok(())
    }

    fn execute(&mut self, task: String) -> Result<String, WorkerError> {
        if task.contains('\n') {
            return Err(WorkerError::Protocol("task must be a single line".into()));
        }
        let session = self.session.as_mut().ok_or(WorkerError::NotRunning)?;
        let result = Self::exchange(session, &task);

        // A broken pipe or closed output means the child is gone for good.
        if matches!(result, Err(WorkerError::Io(_) | WorkerError::Protocol(_))) {
            warn!(endpoint = %self.endpoint, "Worker process session lost");
            self.shutdown();
        }
        result
    }

    fn shutdown(&mut self) {
        let Some(Session {
            mut child,
            stdin,
            stdout,
        }) = self.session.take()
        else {
            return;
        };
        drop(stdin);
        drop(stdout);

        let deadline = Instant::now() + self.grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(endpoint = %self.endpoint, %status, "Worker process exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => break,
                Err(e) => {
                    warn!(endpoint = %self.endpoint, error = %e, "Failed to poll worker process");
                    break;
                }
            }
        }

        warn!(endpoint = %self.endpoint, "Worker process did not exit, killing");
        if let Err(e) = child.kill() {
            debug!(endpoint = %self.endpoint, error = %e, "Kill failed");
        }
        let _ = child.wait();
    }

    fn is_running(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
