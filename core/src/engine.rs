use std::sync::Arc;

use crate::config::{DispatchKind, EngineConfig};
use crate::deferred::Deferred;
use crate::dispatch::{Dispatch, Executor, MicrotaskQueue, TokioExecutor};
use crate::errors::{ConfigError, Failure};
use crate::promise::{Promise, PromiseValue};
use crate::stats::{Counters, StatsSnapshot};

/// Factory for deferreds, fixing how their reactions are dispatched.
///
/// Cloning an engine is cheap; clones share dispatch and counters.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    dispatch: Dispatch,
    microtasks: Option<Arc<MicrotaskQueue>>,
    counters: Counters,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_microtasks()
    }
}

impl Engine {
    pub fn new(dispatch: Dispatch) -> Self {
        Self::build(dispatch, None)
    }

    fn build(dispatch: Dispatch, microtasks: Option<Arc<MicrotaskQueue>>) -> Self {
        tracing::debug!(?dispatch, "engine created");
        Self {
            inner: Arc::new(EngineInner {
                dispatch,
                microtasks,
                counters: Counters::default(),
            }),
        }
    }

    pub fn synchronous() -> Self {
        Self::new(Dispatch::Synchronous)
    }

    /// Asynchronous dispatch onto a fresh microtask queue, reachable through
    /// [`microtasks`](Self::microtasks).
    pub fn with_microtasks() -> Self {
        let queue = Arc::new(MicrotaskQueue::new());
        let executor: Arc<dyn Executor> = queue.clone();
        Self::build(Dispatch::Asynchronous(executor), Some(queue))
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self::new(Dispatch::Asynchronous(executor))
    }

    /// Tokio dispatch needs to be called from inside a runtime.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(match config.dispatch {
            DispatchKind::Synchronous => Self::synchronous(),
            DispatchKind::Microtask => Self::with_microtasks(),
            DispatchKind::Tokio => Self::with_executor(Arc::new(TokioExecutor::current()?)),
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.inner.dispatch
    }

    pub fn microtasks(&self) -> Option<&Arc<MicrotaskQueue>> {
        self.inner.microtasks.as_ref()
    }

    /// Drains this engine's own microtask queue, if it has one.
    pub fn run_microtasks(&self) -> usize {
        self.microtasks().map_or(0, |queue| queue.run_until_idle())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.counters.snapshot()
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.inner.counters
    }

    pub fn defer<T: PromiseValue>(&self) -> Deferred<T> {
        Deferred::new(self.clone())
    }

    pub fn resolved<T: PromiseValue>(&self, value: T) -> Promise<T> {
        let deferred = self.defer();
        deferred.resolve(value);
        deferred.promise()
    }

    pub fn rejected<T: PromiseValue>(&self, reason: impl Into<Failure>) -> Promise<T> {
        let deferred = self.defer();
        deferred.reject(reason);
        deferred.promise()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dispatch", &self.inner.dispatch)
            .field("stats", &self.stats())
            .finish()
    }
}
