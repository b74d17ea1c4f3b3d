use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cell::Cell;
use crate::errors::Failure;
use crate::promise::PromiseValue;
use crate::settlement::Settlement;
use crate::thenable::{Outcome, Thenable};

/// Serializes the cycle check with recording who follows whom, so two cells
/// adopting each other from different threads cannot both miss the cycle.
static ADOPTION: Mutex<()> = Mutex::new(());

/// Turns a reaction's result into the settlement of `target`.
pub(crate) fn resolve<T: PromiseValue>(
    target: &Arc<Cell<T>>,
    candidate: Result<Outcome<T>, Failure>,
) {
    match candidate {
        Err(failure) => {
            target.settle(Settlement::Rejected(failure));
        }
        Ok(Outcome::Value(value)) => {
            target.settle(Settlement::Fulfilled(value));
        }
        Ok(Outcome::Adopt(thenable)) => adopt(target, thenable),
    }
}

fn adopt<T: PromiseValue>(target: &Arc<Cell<T>>, thenable: Box<dyn Thenable<T>>) {
    if let Some(origin) = thenable.origin() {
        let cyclic = {
            let _adoption = ADOPTION.lock().unwrap_or_else(PoisonError::into_inner);
            let cyclic = origin.leads_to(target.id());
            if !cyclic {
                target.follow(&origin);
            }
            cyclic
        };
        if cyclic {
            target.settle(Settlement::Rejected(Failure::cycle(target.id())));
            return;
        }
        tracing::trace!(cell = %target.id(), following = %origin.id(), "adopting promise");
    }

    let delivered = Arc::new(AtomicBool::new(false));
    let on_fulfilled = {
        let delivered = Arc::clone(&delivered);
        let target = Arc::clone(target);
        Box::new(move |value: T| {
            if !delivered.swap(true, Ordering::AcqRel) {
                target.settle(Settlement::Fulfilled(value));
            }
        })
    };
    let on_rejected = {
        let delivered = Arc::clone(&delivered);
        let target = Arc::clone(target);
        Box::new(move |reason: Failure| {
            if !delivered.swap(true, Ordering::AcqRel) {
                target.settle(Settlement::Rejected(reason));
            }
        })
    };

    let subscribed = panic::catch_unwind(AssertUnwindSafe(move || {
        thenable.then(on_fulfilled, on_rejected);
    }));
    if let Err(payload) = subscribed
        && !delivered.swap(true, Ordering::AcqRel)
    {
        target.settle(Settlement::Rejected(Failure::from_panic(payload)));
    }
}
