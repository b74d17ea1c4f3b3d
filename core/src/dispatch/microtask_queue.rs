use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Executor, Job};

/// FIFO of pending jobs, drained explicitly by its owner.
#[derive(Default)]
pub struct MicrotaskQueue {
    queue: Mutex<VecDeque<Job>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, job: Job) {
        self.lock().push_back(job);
    }

    pub fn pop(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs jobs until the queue is empty, including jobs enqueued by the
    /// jobs themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.pop() {
            job();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "microtask queue idle");
        }
        ran
    }
}

impl Executor for MicrotaskQueue {
    fn execute(&self, job: Job) {
        self.enqueue(job);
    }
}

impl std::fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
