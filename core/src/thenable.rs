use std::fmt;

use crate::cell::Origin;
use crate::errors::Failure;
use crate::promise::Promise;

pub type OnFulfilled<T> = Box<dyn FnOnce(T) + Send>;
pub type OnRejected = Box<dyn FnOnce(Failure) + Send>;

/// Anything that can report an eventual value to a pair of callbacks.
///
/// Implementing this trait is how foreign asynchronous abstractions become
/// adoptable by a promise. Only the first callback invocation counts; any
/// later call from a misbehaving implementation is ignored.
pub trait Thenable<T>: Send {
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected);

    /// The promise this thenable stands for, if it is one of ours.
    fn origin(&self) -> Option<Origin> {
        None
    }
}

/// What a reaction produces: a plain value, or something to adopt.
pub enum Outcome<T> {
    Value(T),
    Adopt(Box<dyn Thenable<T>>),
}

impl<T> Outcome<T> {
    pub fn adopt(thenable: impl Thenable<T> + 'static) -> Self {
        Outcome::Adopt(Box::new(thenable))
    }
}

impl<T: crate::promise::PromiseValue> From<Promise<T>> for Outcome<T> {
    fn from(promise: Promise<T>) -> Self {
        Outcome::adopt(promise)
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Outcome::Adopt(thenable) => f
                .debug_tuple("Adopt")
                .field(&thenable.origin())
                .finish(),
        }
    }
}
