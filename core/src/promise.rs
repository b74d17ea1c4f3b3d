use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::cell::{Cell, CellId, Origin, Snapshot};
use crate::deferred::Deferred;
use crate::engine::Engine;
use crate::errors::Failure;
use crate::resolution;
use crate::settlement::Settlement;
use crate::thenable::{OnFulfilled, OnRejected, Outcome, Thenable};

/// Values a promise can carry: one settlement is handed to every reaction,
/// possibly on another thread.
pub trait PromiseValue: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> PromiseValue for T {}

/// Boxed callback for [`Promise::then_with`].
pub type Handler<A, U> = Box<dyn FnOnce(A) -> Result<Outcome<U>, Failure> + Send>;

/// Consumer side of a deferred value.
///
/// Every method that chains returns a new promise straight away; the new
/// promise settles once the callback has run, which may be later.
pub struct Promise<T: PromiseValue> {
    pub(crate) cell: Arc<Cell<T>>,
}

impl<T: PromiseValue> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: PromiseValue> Promise<T> {
    pub(crate) fn from_cell(cell: Arc<Cell<T>>) -> Self {
        Self { cell }
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    pub fn engine(&self) -> &Engine {
        self.cell.engine()
    }

    /// Whether both handles view the same underlying promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn inspect(&self) -> Snapshot<T> {
        self.cell.snapshot()
    }

    pub fn is_pending(&self) -> bool {
        self.cell.is_pending()
    }

    /// Maps the fulfilled value. Rejections pass through untouched.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: PromiseValue,
        F: FnOnce(T) -> Result<U, Failure> + Send + 'static,
    {
        self.react(move |settlement| match settlement {
            Settlement::Fulfilled(value) => on_fulfilled(value).map(Outcome::Value),
            Settlement::Rejected(reason) => Err(reason),
        })
    }

    /// Like [`then`](Self::then), but the callback may hand back a promise
    /// or other thenable whose eventual outcome is adopted.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: PromiseValue,
        F: FnOnce(T) -> Result<Outcome<U>, Failure> + Send + 'static,
    {
        self.react(move |settlement| match settlement {
            Settlement::Fulfilled(value) => on_fulfilled(value),
            Settlement::Rejected(reason) => Err(reason),
        })
    }

    pub fn then_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: PromiseValue,
        F: FnOnce(T) -> Result<U, Failure> + Send + 'static,
        R: FnOnce(Failure) -> Result<U, Failure> + Send + 'static,
    {
        self.react(move |settlement| {
            match settlement {
                Settlement::Fulfilled(value) => on_fulfilled(value),
                Settlement::Rejected(reason) => on_rejected(reason),
            }
            .map(Outcome::Value)
        })
    }

    /// Handles a rejection. Fulfilment passes through untouched.
    pub fn otherwise<R>(&self, on_rejected: R) -> Promise<T>
    where
        R: FnOnce(Failure) -> Result<T, Failure> + Send + 'static,
    {
        self.react(move |settlement| match settlement {
            Settlement::Fulfilled(value) => Ok(Outcome::Value(value)),
            Settlement::Rejected(reason) => on_rejected(reason).map(Outcome::Value),
        })
    }

    pub fn or_else<R>(&self, on_rejected: R) -> Promise<T>
    where
        R: FnOnce(Failure) -> Result<Outcome<T>, Failure> + Send + 'static,
    {
        self.react(move |settlement| match settlement {
            Settlement::Fulfilled(value) => Ok(Outcome::Value(value)),
            Settlement::Rejected(reason) => on_rejected(reason),
        })
    }

    /// The two-handler form where either side may be absent. A missing
    /// handler forwards that side of the settlement unchanged.
    pub fn then_with(
        &self,
        on_fulfilled: Option<Handler<T, T>>,
        on_rejected: Option<Handler<Failure, T>>,
    ) -> Promise<T> {
        self.react(move |settlement| match settlement {
            Settlement::Fulfilled(value) => match on_fulfilled {
                Some(handler) => handler(value),
                None => Ok(Outcome::Value(value)),
            },
            Settlement::Rejected(reason) => match on_rejected {
                Some(handler) => handler(reason),
                None => Err(reason),
            },
        })
    }

    /// Runs `on_settled` whichever way this promise settles, then forwards
    /// the settlement. If `on_settled` fails, its failure replaces it.
    pub fn always<F>(&self, on_settled: F) -> Promise<T>
    where
        F: FnOnce() -> Result<(), Failure> + Send + 'static,
    {
        self.react(move |settlement| {
            on_settled()?;
            settlement.into_result().map(Outcome::Value)
        })
    }

    /// Converts the fulfilled value, rejecting with a type mismatch when the
    /// conversion fails.
    pub fn cast<U>(&self) -> Promise<U>
    where
        U: PromiseValue + TryFrom<T>,
        <U as TryFrom<T>>::Error: fmt::Display,
    {
        self.then(|value| {
            U::try_from(value).map_err(|err| {
                Failure::type_mismatch(
                    type_name::<U>(),
                    format_args!("a {} that does not convert ({err})", type_name::<T>()),
                )
            })
        })
    }

    /// Resolves once this promise settles. Does not drive any executor; with
    /// microtask dispatch the queue still has to be run.
    pub fn settled(&self) -> impl Future<Output = Settlement<T>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.cell.subscribe(Box::new(move |settlement| {
            let _ = tx.send(settlement);
        }));
        async move {
            rx.await
                .unwrap_or_else(|_| Settlement::Rejected(Failure::abandoned()))
        }
    }

    fn react<U, H>(&self, handler: H) -> Promise<U>
    where
        U: PromiseValue,
        H: FnOnce(Settlement<T>) -> Result<Outcome<U>, Failure> + Send + 'static,
    {
        let downstream = Deferred::<U>::new(self.engine().clone());
        let promise = downstream.promise();
        let target = downstream.into_cell();
        self.cell.subscribe(Box::new(move |settlement| {
            let candidate = panic::catch_unwind(AssertUnwindSafe(move || handler(settlement)))
                .unwrap_or_else(|payload| Err(Failure::from_panic(payload)));
            resolution::resolve(&target, candidate);
        }));
        promise
    }
}

impl<T: PromiseValue> Thenable<T> for Promise<T> {
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected) {
        self.cell.subscribe(Box::new(move |settlement| match settlement {
            Settlement::Fulfilled(value) => on_fulfilled(value),
            Settlement::Rejected(reason) => on_rejected(reason),
        }));
    }

    fn origin(&self) -> Option<Origin> {
        Some(Origin::of(&self.cell))
    }
}

impl<T: PromiseValue + fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.inspect())
            .finish()
    }
}
