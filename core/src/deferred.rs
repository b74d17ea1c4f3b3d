use std::fmt;
use std::sync::Arc;

use crate::cell::{Cell, CellId};
use crate::engine::Engine;
use crate::errors::Failure;
use crate::promise::{Promise, PromiseValue};
use crate::resolution;
use crate::settlement::Settlement;
use crate::thenable::{Outcome, Thenable};

/// Producer side of a promise.
///
/// Only the first of `resolve`, `resolve_with`, `adopt` or `reject` has any
/// effect, and each reports whether it was that first call. A resolution
/// that adopts a still-pending thenable counts as first even though the
/// promise settles later.
pub struct Deferred<T: PromiseValue> {
    cell: Arc<Cell<T>>,
}

impl<T: PromiseValue> Deferred<T> {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            cell: Cell::new(engine),
        }
    }

    pub(crate) fn into_cell(self) -> Arc<Cell<T>> {
        self.cell
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// The consumer view. Every call returns a handle onto the same promise.
    pub fn promise(&self) -> Promise<T> {
        Promise::from_cell(Arc::clone(&self.cell))
    }

    pub fn is_pending(&self) -> bool {
        self.cell.is_pending()
    }

    pub fn resolve(&self, value: T) -> bool {
        if !self.cell.claim() {
            return false;
        }
        self.cell.settle(Settlement::Fulfilled(value))
    }

    pub fn resolve_with(&self, outcome: Outcome<T>) -> bool {
        if !self.cell.claim() {
            return false;
        }
        resolution::resolve(&self.cell, Ok(outcome));
        true
    }

    pub fn adopt(&self, thenable: impl Thenable<T> + 'static) -> bool {
        self.resolve_with(Outcome::adopt(thenable))
    }

    pub fn reject(&self, reason: impl Into<Failure>) -> bool {
        if !self.cell.claim() {
            return false;
        }
        self.cell.settle(Settlement::Rejected(reason.into()))
    }

    /// Settles with the outcome of a fallible computation.
    pub fn complete(&self, result: Result<T, Failure>) -> bool {
        match result {
            Ok(value) => self.resolve(value),
            Err(reason) => self.reject(reason),
        }
    }
}

impl<T: PromiseValue + fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("state", &self.cell.snapshot())
            .finish()
    }
}
