use std::sync::Arc;

use crate::error::Error;
use crate::promise::Promise;
use crate::scheduler::Scheduler;
use crate::settle::Settle;
use crate::thenable::Resolution;

/// Builds promises bound to one scheduler.
///
/// Every promise created through an executor, and every promise chained from
/// one, runs its continuations on that scheduler. [`resolve`](Self::resolve)
/// passes a promise through untouched only if it belongs to the same scheduler.
#[derive(Clone)]
pub struct Executor {
    scheduler: Arc<dyn Scheduler>,
}

impl Executor {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Whether `promise` was created by this executor or chained from one that was.
    pub fn owns<T, E>(&self, promise: &Promise<T, E>) -> bool {
        promise.bound_to(&self.scheduler)
    }

    /// A pending promise together with the handle that settles it.
    pub fn pending<T, E>(&self) -> (Settle<T, E>, Promise<T, E>)
    where
        T: Clone + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
    {
        let promise = Promise::internal(self.scheduler.clone(), String::new());
        (Settle::new(promise.clone()), promise)
    }

    /// A promise settled with `value`.
    ///
    /// A promise of this executor is returned as is. A value fulfills at once;
    /// a foreign promise or thenable is adopted.
    pub fn resolve<T, E>(&self, value: impl Into<Resolution<T, E>>) -> Promise<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
    {
        match value.into() {
            Resolution::Promise(promise) if self.owns(&promise) => promise,
            resolution => {
                let promise = Promise::internal(self.scheduler.clone(), String::new());
                promise.resolve_with(resolution);
                promise
            }
        }
    }

    /// A promise already rejected with `reason`.
    pub fn reject<T, E>(&self, reason: E) -> Promise<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
    {
        let promise = Promise::internal(self.scheduler.clone(), String::new());
        promise.reject(reason);
        promise
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}
