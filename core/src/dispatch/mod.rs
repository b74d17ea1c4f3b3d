mod microtask_queue;
mod tokio_executor;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

pub use microtask_queue::MicrotaskQueue;
pub use tokio_executor::TokioExecutor;

/// A unit of deferred work: firing the reactions of one settled promise.
pub type Job = Box<dyn FnOnce() + Send>;

/// Somewhere to run jobs later, off the caller's stack.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// How an engine fires reactions.
#[derive(Clone)]
pub enum Dispatch {
    /// Inline, on the thread that settled the promise or registered the
    /// reaction. Everything a call triggers has run by the time the
    /// outermost `resolve`, `reject` or `then` returns.
    Synchronous,
    /// Handed to an executor; `resolve`, `reject` and `then` return first.
    Asynchronous(Arc<dyn Executor>),
}

impl Dispatch {
    pub fn is_synchronous(&self) -> bool {
        matches!(self, Dispatch::Synchronous)
    }

    pub(crate) fn dispatch(&self, job: Job) {
        match self {
            Dispatch::Synchronous => run_inline(job),
            Dispatch::Asynchronous(executor) => executor.execute(job),
        }
    }
}

thread_local! {
    /// Jobs queued by synchronous dispatch while an outer job is running on
    /// this thread. `None` when no synchronous job is running.
    static INLINE: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Runs `job` before returning, unless a synchronous job is already running
/// on this thread, in which case it is queued for that job's loop. Long
/// chains then settle in a loop instead of one stack frame per link.
fn run_inline(job: Job) {
    let first = INLINE.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(queued) => {
                queued.push_back(job);
                None
            }
            None => {
                *slot = Some(VecDeque::new());
                Some(job)
            }
        }
    });
    let Some(first) = first else {
        return;
    };

    let _reset = ResetInline;
    let mut next = Some(first);
    while let Some(job) = next {
        job();
        next = INLINE.with(|slot| slot.borrow_mut().as_mut().and_then(VecDeque::pop_front));
    }
}

struct ResetInline;

impl Drop for ResetInline {
    fn drop(&mut self) {
        let _ = INLINE.try_with(|slot| slot.borrow_mut().take());
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Synchronous => f.write_str("Synchronous"),
            Dispatch::Asynchronous(_) => f.write_str("Asynchronous(..)"),
        }
    }
}
