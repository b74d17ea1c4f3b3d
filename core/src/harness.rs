//! Deterministic driver for tests: a mocked producer whose promises are
//! settled by hand, oldest first.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::deferred::Deferred;
use crate::engine::Engine;
use crate::errors::{Failure, HarnessError};
use crate::promise::{Promise, PromiseValue};
use crate::thenable::Outcome;

pub struct SettlementQueue<T: PromiseValue> {
    engine: Engine,
    outstanding: Mutex<VecDeque<Deferred<T>>>,
}

impl<T: PromiseValue> SettlementQueue<T> {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            outstanding: Mutex::new(VecDeque::new()),
        }
    }

    /// A synchronous-dispatch queue, so chains settle as soon as the
    /// queue is driven.
    pub fn synchronous() -> Self {
        Self::new(Engine::synchronous())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Deferred<T>>> {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands out a new pending promise and remembers its deferred.
    pub fn request(&self) -> Promise<T> {
        let deferred = self.engine.defer();
        let promise = deferred.promise();
        self.lock().push_back(deferred);
        promise
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn next(&self) -> Result<Deferred<T>, HarnessError> {
        // Popped before settling: a reaction may call `request` again.
        self.lock().pop_front().ok_or(HarnessError::Empty)
    }

    pub fn resolve_next(&self, value: T) -> Result<(), HarnessError> {
        self.next()?.resolve(value);
        Ok(())
    }

    pub fn resolve_next_with(&self, outcome: Outcome<T>) -> Result<(), HarnessError> {
        self.next()?.resolve_with(outcome);
        Ok(())
    }

    pub fn reject_next(&self, reason: impl Into<Failure>) -> Result<(), HarnessError> {
        self.next()?.reject(reason);
        Ok(())
    }

    /// Resolves every outstanding deferred, oldest first, including ones
    /// requested while draining. Returns how many were settled.
    pub fn resolve_all(&self, value: T) -> usize {
        let mut settled = 0;
        while let Ok(deferred) = self.next() {
            deferred.resolve(value.clone());
            settled += 1;
        }
        settled
    }
}
