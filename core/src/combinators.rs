use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::Engine;
use crate::promise::{Promise, PromiseValue};
use crate::settlement::Settlement;

struct Gather<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl Engine {
    /// Fulfils with every value in input order once all inputs fulfil, or
    /// rejects with the first rejection.
    pub fn all<T: PromiseValue>(&self, promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
        let deferred = self.defer::<Vec<T>>();
        let promise = deferred.promise();
        if promises.is_empty() {
            deferred.resolve(Vec::new());
            return promise;
        }

        let gather = Arc::new(Mutex::new(Gather {
            values: vec![None; promises.len()],
            remaining: promises.len(),
        }));
        let deferred = Arc::new(deferred);
        for (index, input) in promises.into_iter().enumerate() {
            let gather = Arc::clone(&gather);
            let deferred = Arc::clone(&deferred);
            input.cell.subscribe(Box::new(move |settlement| match settlement {
                Settlement::Fulfilled(value) => {
                    let complete = {
                        let mut gather = gather.lock().unwrap_or_else(PoisonError::into_inner);
                        gather.values[index] = Some(value);
                        gather.remaining -= 1;
                        let values: Option<Vec<T>> = (gather.remaining == 0)
                            .then(|| gather.values.drain(..).flatten().collect());
                        values
                    };
                    if let Some(values) = complete {
                        deferred.resolve(values);
                    }
                }
                Settlement::Rejected(reason) => {
                    deferred.reject(reason);
                }
            }));
        }
        promise
    }

    /// Settles like whichever input settles first. With no inputs the
    /// result stays pending.
    pub fn race<T: PromiseValue>(&self, promises: Vec<Promise<T>>) -> Promise<T> {
        let deferred = Arc::new(self.defer::<T>());
        for input in promises {
            let deferred = Arc::clone(&deferred);
            input.cell.subscribe(Box::new(move |settlement| {
                match settlement {
                    Settlement::Fulfilled(value) => deferred.resolve(value),
                    Settlement::Rejected(reason) => deferred.reject(reason),
                };
            }));
        }
        deferred.promise()
    }
}
