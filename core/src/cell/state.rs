use std::collections::VecDeque;
use std::sync::Weak;

use serde::Serialize;

use super::Tracked;
use crate::errors::Failure;
use crate::settlement::Settlement;

pub(crate) type Reaction<T> = Box<dyn FnOnce(Settlement<T>) + Send>;

/// Point-in-time view of a promise, as returned by `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Snapshot<T> {
    Pending,
    Fulfilled(T),
    Rejected(Failure),
}

impl<T> Snapshot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Snapshot::Pending)
    }

    pub fn into_settlement(self) -> Option<Settlement<T>> {
        match self {
            Snapshot::Pending => None,
            Snapshot::Fulfilled(value) => Some(Settlement::Fulfilled(value)),
            Snapshot::Rejected(reason) => Some(Settlement::Rejected(reason)),
        }
    }
}

impl<T> From<Settlement<T>> for Snapshot<T> {
    fn from(settlement: Settlement<T>) -> Self {
        match settlement {
            Settlement::Fulfilled(value) => Snapshot::Fulfilled(value),
            Settlement::Rejected(reason) => Snapshot::Rejected(reason),
        }
    }
}

pub(crate) struct CellState<T> {
    pub settlement: Option<Settlement<T>>,
    pub reactions: VecDeque<Reaction<T>>,
    /// Set by the first resolve/reject on the producer side, before any
    /// adoption completes.
    pub locked: bool,
    /// A drain job is scheduled or running for this cell.
    pub draining: bool,
    pub observed: bool,
    pub following: Option<Weak<dyn Tracked>>,
}

impl<T> CellState<T> {
    pub fn pending() -> Self {
        Self {
            settlement: None,
            reactions: VecDeque::new(),
            locked: false,
            draining: false,
            observed: false,
            following: None,
        }
    }
}
