use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::latch::Latch;
use crate::promise::Promise;
use crate::thenable::Resolution;

type ResolverFn<T, E> = Box<dyn FnOnce(Settle<T, E>) -> Result<(), E> + Send + 'static>;

/// The body run by [`Promise::new`], optionally carrying a name.
///
/// A named resolver names the promise it builds, so its outcome is recorded in
/// [`NamedValues`](crate::NamedValues) under that name.
pub struct Resolver<T, E> {
    name: Option<String>,
    body: ResolverFn<T, E>,
}

impl<T, E> Resolver<T, E> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Settle<T, E>) -> Result<(), E> + Send + 'static,
    {
        Self {
            name: None,
            body: Box::new(f),
        }
    }

    pub fn named<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Settle<T, E>) -> Result<(), E> + Send + 'static,
    {
        Self {
            name: Some(name.into()),
            body: Box::new(f),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<String>, ResolverFn<T, E>) {
        (self.name, self.body)
    }
}

/// The settlement callbacks for one promise.
///
/// Clones share one latch: across all of them, only the first call to
/// [`fulfill`](Self::fulfill), [`resolve`](Self::resolve) or
/// [`reject`](Self::reject) has an effect.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use named_promise::{Error, Executor, PromiseState, TaskQueue};
///
/// let executor = Executor::new(Arc::new(TaskQueue::new()));
/// let (settle, promise) = executor.pending::<String, Error>();
/// settle.fulfill("🍓".into());
/// settle.reject(Error::failure("too late"));
/// assert_eq!(promise.state(), PromiseState::Fulfilled);
/// ```
pub struct Settle<T, E> {
    promise: Promise<T, E>,
    latch: Arc<Latch>,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            latch: self.latch.clone(),
        }
    }
}

impl<T, E> Settle<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self {
            promise,
            latch: Arc::new(Latch::new()),
        }
    }

    /// Fulfill with a plain value.
    pub fn fulfill(&self, value: T) {
        self.resolve(Resolution::Value(value));
    }

    /// Settle with a value, a promise or a thenable. Promises and thenables are
    /// adopted: the target settles when they do.
    pub fn resolve(&self, resolution: impl Into<Resolution<T, E>>) {
        if self.latch.fire() {
            self.promise.resolve_with(resolution.into());
        } else {
            debug!(name = %self.promise.name(), "settle handle already used");
        }
    }

    pub fn reject(&self, reason: E) {
        if self.latch.fire() {
            self.promise.reject(reason);
        } else {
            debug!(name = %self.promise.name(), "settle handle already used");
        }
    }

    /// Whether any clone of this handle has been used.
    pub fn is_spent(&self) -> bool {
        self.latch.is_fired()
    }

    /// Run a resolver body, turning an `Err` return or a panic into a rejection
    /// unless the body already settled.
    pub(crate) fn run(self, body: ResolverFn<T, E>) {
        let handle = self.clone();
        match catch_unwind(AssertUnwindSafe(move || body(handle))) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => self.reject(reason),
            Err(payload) => self.reject(Error::from_panic(payload).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Executor, Promise, Resolver, Settlement, TaskQueue};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn clones_share_one_latch() {
        let executor = Executor::new(Arc::new(TaskQueue::new()));
        let (settle, promise) = executor.pending::<i32, Error>();
        let other = settle.clone();
        assert!(!settle.is_spent());
        other.reject(Error::failure("first"));
        settle.fulfill(2);
        assert!(settle.is_spent());
        assert_eq!(
            promise.settlement(),
            Some(Settlement::Rejected(Error::failure("first")))
        );
    }

    #[test]
    fn settles_from_another_thread() {
        let executor = Executor::new(Arc::new(TaskQueue::new()));
        let p: Promise<String> = Promise::new(
            &executor,
            Resolver::new(|settle| {
                thread::spawn(move || settle.fulfill(String::from("🍓")))
                    .join()
                    .expect("The settling thread has panicked");
                Ok(())
            }),
        );
        assert_eq!(p.settlement(), Some(Settlement::Fulfilled("🍓".to_string())));
    }
}
