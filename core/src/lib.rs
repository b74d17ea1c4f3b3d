//! Deferred values and `then` chains with exactly-once settlement.
//!
//! A [`Deferred`] is the producer side and a [`Promise`] the consumer side
//! of one eventual value. Chaining with [`Promise::then`] and friends builds
//! new promises that settle once their callback has run; an [`Engine`]
//! decides whether those callbacks run inline or on an executor.

pub mod cell;
mod combinators;
pub mod config;
pub mod deferred;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod harness;
pub mod promise;
mod resolution;
pub mod settlement;
mod stats;
pub mod thenable;

pub use cell::{CellId, Origin, Snapshot};
pub use config::{DispatchKind, EngineConfig};
pub use deferred::Deferred;
pub use dispatch::{Dispatch, Executor, MicrotaskQueue, TokioExecutor};
pub use engine::Engine;
pub use errors::{Failure, FailureKind};
pub use promise::{Handler, Promise, PromiseValue};
pub use settlement::Settlement;
pub use stats::StatsSnapshot;
pub use thenable::{Outcome, Thenable};

/// A fresh deferred on a default (microtask) engine.
pub fn defer<T: PromiseValue>() -> Deferred<T> {
    Engine::default().defer()
}
