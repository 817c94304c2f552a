//! Worker thread loop for [`PriorityTaskPool`](super::PriorityTaskPool).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::Shared;
use crate::core::audit::JobAction;
use crate::core::{Job, JobCancelled, JobHandle, JobOutcome, JobState};

/// Body of every worker thread: take jobs until the pool shuts down or this
/// thread retires.
pub(super) fn run_worker(shared: &Arc<Shared>, worker_id: usize) {
    debug!(worker_id, "Worker thread started");
    shared.state.lock().starting -= 1;

    while let Some((handle, job)) = next_job(shared, worker_id) {
        execute(shared, worker_id, &handle, job);
    }

    debug!(worker_id, "Worker thread exiting");
}

/// Block until a job may start, honoring the pause gate.
///
/// Returns `None` when the pool is shut down with an empty queue, or when
/// this worker is above `min_workers` and stayed idle past the timeout. The
/// worker count is decremented before returning `None`.
fn next_job(shared: &Shared, worker_id: usize) -> Option<(Arc<JobHandle>, Job)> {
    let config = &shared.config;
    let mut state = shared.state.lock();
    loop {
        if !state.paused {
            if let Some((ticket, job)) = state.queue.pop() {
                // Running is set under the state lock so cancel sees either
                // a queued job or a running one, never neither.
                if let Some(handle) = shared.registry.get(job.id(), ticket) {
                    handle.set_state(JobState::Running);
                    shared.counters.active.fetch_add(1, Ordering::Relaxed);
                    return Some((handle, job));
                }
                error!(worker_id, job_id = %job.id(), ticket, "Dequeued job missing from registry, dropping");
                continue;
            }
            if !state.running {
                state.workers -= 1;
                shared.worker_exited.notify_all();
                return None;
            }
        }

        state.idle += 1;
        let timed_out = if state.workers > config.min_workers {
            shared
                .work_available
                .wait_for(&mut state, config.idle_timeout())
                .timed_out()
        } else {
            shared.work_available.wait(&mut state);
            false
        };
        state.idle -= 1;

        if timed_out
            && state.running
            && state.queue.is_empty()
            && state.workers > config.min_workers
        {
            state.workers -= 1;
            debug!(worker_id, workers = state.workers, "Retiring idle worker");
            shared.worker_exited.notify_all();
            return None;
        }
    }
}

/// Run one job, catching errors and panics so the thread survives.
fn execute(shared: &Shared, worker_id: usize, handle: &JobHandle, job: Job) {
    let info = Arc::clone(&job.info);
    let stop = job.stop_token();

    debug!(worker_id, job_id = %info.id, priority = info.priority, "Worker executing job");
    shared.record(&info, JobAction::Started);

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
        Ok(Ok(())) if stop.is_requested() => JobOutcome::Cancelled,
        Ok(Ok(())) => JobOutcome::Completed,
        Ok(Err(e)) if stop.is_requested() || e.is::<JobCancelled>() => {
            debug!(worker_id, job_id = %info.id, reason = %e, "Job exited after stop request");
            JobOutcome::Cancelled
        }
        Ok(Err(e)) => {
            error!(worker_id, job_id = %info.id, error = ?e, "Job failed");
            JobOutcome::Failed(format!("{e:#}"))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(worker_id, job_id = %info.id, panic = %msg, "Job panicked");
            JobOutcome::Failed(format!("panicked: {msg}"))
        }
    };

    handle.set_state(JobState::Finished);
    shared.registry.unregister(&info.id, handle.ticket());
    shared.counters.active.fetch_sub(1, Ordering::Relaxed);
    shared.counters.record(&outcome);

    match &outcome {
        JobOutcome::Completed => debug!(worker_id, job_id = %info.id, "Worker completed job"),
        JobOutcome::Cancelled => info!(worker_id, job_id = %info.id, "Job stopped on request"),
        JobOutcome::Failed(_) => {}
    }
    shared.record(&info, JobAction::Finished(outcome));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
