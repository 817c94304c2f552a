//! In-memory job queue ordered by priority, FIFO within a priority.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::{Job, JobInfo};

/// Heap entry ordering jobs by ascending priority rank, then submission order.
struct QueuedJob {
    seq: u64,
    job: Job,
}

impl QueuedJob {
    fn priority(&self) -> i32 {
        self.job.info.priority
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the lowest rank and the earliest sequence compare greatest.
        other
            .priority()
            .cmp(&self.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending jobs.
///
/// Each job is pushed with a caller-supplied sequence number which doubles as
/// its handle for [`remove`](Self::remove). Sequence numbers must increase with
/// submission order for FIFO tie-breaking to hold.
pub struct PriorityJobQueue {
    max_depth: usize,
    jobs: BinaryHeap<QueuedJob>,
}

impl PriorityJobQueue {
    /// Create a queue that holds at most `max_depth` jobs.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            jobs: BinaryHeap::with_capacity(max_depth.min(1024)),
        }
    }

    /// Enqueue a job, handing it back if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the job unchanged when `max_depth` is reached.
    pub fn push(&mut self, seq: u64, job: Job) -> Result<(), Job> {
        if self.jobs.len() >= self.max_depth {
            return Err(job);
        }
        self.jobs.push(QueuedJob { seq, job });
        Ok(())
    }

    /// Remove and return the next job with its sequence number.
    pub fn pop(&mut self) -> Option<(u64, Job)> {
        self.jobs.pop().map(|q| (q.seq, q.job))
    }

    /// Remove the job pushed with `seq`, if it is still queued.
    pub fn remove(&mut self, seq: u64) -> Option<Job> {
        let mut removed = None;
        let jobs = std::mem::take(&mut self.jobs).into_vec();
        self.jobs = jobs
            .into_iter()
            .filter_map(|q| {
                if q.seq == seq && removed.is_none() {
                    removed = Some(q.job);
                    None
                } else {
                    Some(q)
                }
            })
            .collect();
        removed
    }

    /// Remove every queued job, in dequeue order.
    pub fn drain(&mut self) -> Vec<(u64, Job)> {
        let mut out = Vec::with_capacity(self.jobs.len());
        while let Some(next) = self.pop() {
            out.push(next);
        }
        out
    }

    /// Info of the job that would be dequeued next.
    #[must_use]
    pub fn peek(&self) -> Option<&JobInfo> {
        self.jobs.peek().map(|q| q.job.info())
    }

    /// Maximum depth allowed for this queue.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
