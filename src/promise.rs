//! The promise state machine and its chaining API.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::continuation::{Continuation, Handler};
use crate::error::Error;
use crate::executor::Executor;
use crate::named::NamedValues;
use crate::scheduler::Scheduler;
use crate::settle::{Resolver, Settle};
use crate::state::{PromiseState, Settlement, State};
use crate::thenable::{self, Resolution};

/// A value that becomes available later, exactly once, as either a fulfillment
/// value `T` or a rejection reason `E`.
///
/// `Promise` is a handle: clones refer to the same promise. Each promise carries
/// a name and a [`NamedValues`] map of everything its named ancestors settled
/// with, which handlers can read.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use named_promise::{Executor, Handler, Promise, Resolver, TaskQueue};
///
/// let queue = Arc::new(TaskQueue::new());
/// let executor = Executor::new(queue.clone());
///
/// let total: Promise<i32> = Promise::new(
///     &executor,
///     Resolver::named("step1", |settle| {
///         settle.fulfill(10);
///         Ok(())
///     }),
/// )
/// .then(Some(Handler::named("step2", |v: i32, _| Ok(v + 1))), None)
/// .then(
///     Some(Handler::named("step3", |v: i32, named| {
///         Ok(v + named.value("step1").copied().unwrap_or_default())
///     })),
///     None,
/// );
///
/// queue.run_until_idle();
/// assert_eq!(total.settlement().map(|s| s.into_result()), Some(Ok(21)));
/// ```
pub struct Promise<T, E = Error> {
    shared: Arc<Shared<T, E>>,
}

struct Shared<T, E> {
    scheduler: Arc<dyn Scheduler>,
    inner: Mutex<Inner<T, E>>,
}

struct Inner<T, E> {
    name: String,
    state: State<T, E>,
    named: NamedValues<T, E>,
    queue: Vec<Continuation<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    /// Create a promise and run `resolver` synchronously to settle it.
    ///
    /// The resolver receives a [`Settle`] handle. Only the first of
    /// `fulfill`/`resolve`/`reject`, an `Err` return or a panic takes effect.
    pub fn new(executor: &Executor, resolver: Resolver<T, E>) -> Self {
        let (name, body) = resolver.into_parts();
        let promise = Self::internal(executor.scheduler().clone(), name.unwrap_or_default());
        Settle::new(promise.clone()).run(body);
        promise
    }

    /// A pending promise whose settlement is driven by the engine, not a resolver.
    pub(crate) fn internal(scheduler: Arc<dyn Scheduler>, name: String) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduler,
                inner: Mutex::new(Inner {
                    name,
                    state: State::Pending,
                    named: NamedValues::new(),
                    queue: Vec::new(),
                }),
            }),
        }
    }

    /// Attach continuations.
    ///
    /// Handlers always run on the scheduler, never inside this call. If the
    /// promise has already settled and the matching handler is `None`, the
    /// promise itself is returned; otherwise a new child promise is.
    pub fn then(
        &self,
        on_fulfilled: Option<Handler<T, T, E>>,
        on_rejected: Option<Handler<E, T, E>>,
    ) -> Promise<T, E> {
        let mut inner = self.shared.inner.lock();
        match inner.state.kind() {
            PromiseState::Fulfilled if on_fulfilled.is_none() => return self.clone(),
            PromiseState::Rejected if on_rejected.is_none() => return self.clone(),
            PromiseState::Pending => {
                let child = self.derive();
                inner
                    .queue
                    .push(Continuation::new(child.clone(), on_fulfilled, on_rejected));
                return child;
            }
            _ => {}
        }
        let settlement = inner.state.settlement();
        let named = inner.named.clone();
        drop(inner);

        let child = self.derive();
        child.inherit(&named);
        if let Some(settlement) = settlement {
            let continuation = Continuation::new(child.clone(), on_fulfilled, on_rejected);
            if let Some((passed, settlement)) = continuation.dispatch(settlement) {
                passed.settle(settlement);
            }
        }
        child
    }

    /// Shorthand for `then(None, on_rejected)`.
    pub fn catch(&self, on_rejected: Option<Handler<E, T, E>>) -> Promise<T, E> {
        self.then(None, on_rejected)
    }

    /// Settle with a resolution, assimilating promises and thenables.
    pub(crate) fn resolve_with(&self, resolution: Resolution<T, E>) {
        thenable::resolve(self, resolution);
    }

    pub(crate) fn fulfill(&self, value: T) {
        self.settle(Settlement::Fulfilled(value));
    }

    pub(crate) fn reject(&self, reason: E) {
        self.settle(Settlement::Rejected(reason));
    }

    /// Settle this promise and drain its waiting continuations.
    ///
    /// Children without a matching handler take the outcome right here. They go
    /// on a worklist rather than the call stack, so long pass-through chains
    /// settle in constant stack depth.
    fn settle(&self, settlement: Settlement<T, E>) {
        let mut worklist = VecDeque::from([(self.clone(), settlement)]);
        while let Some((promise, settlement)) = worklist.pop_front() {
            let Some((queue, named)) = promise.record(&settlement) else {
                continue;
            };
            for continuation in queue {
                continuation.child().inherit(&named);
                if let Some(next) = continuation.dispatch(settlement.clone()) {
                    worklist.push_back(next);
                }
            }
        }
    }

    /// Store the outcome and take the queued continuations, or `None` if this
    /// promise had already settled.
    #[allow(clippy::type_complexity)]
    fn record(
        &self,
        settlement: &Settlement<T, E>,
    ) -> Option<(Vec<Continuation<T, E>>, NamedValues<T, E>)> {
        let mut inner = self.shared.inner.lock();
        if inner.state.kind().is_settled() {
            debug!(name = %inner.name, "promise already settled, ignoring");
            return None;
        }
        let name = inner.name.clone();
        trace!(name = %name, state = ?settlement.state(), "promise settled");
        inner.named.record(name, settlement.clone());
        inner.state = settlement.clone().into();
        let queue = std::mem::take(&mut inner.queue);
        let named = inner.named.clone();
        Some((queue, named))
    }

    fn derive(&self) -> Promise<T, E> {
        Self::internal(self.shared.scheduler.clone(), String::new())
    }

    fn inherit(&self, parent: &NamedValues<T, E>) {
        self.shared.inner.lock().named.inherit(parent);
    }

    pub(crate) fn rename(&self, name: &str) {
        self.shared.inner.lock().name = name.to_string();
    }

    pub(crate) fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.shared.scheduler
    }

    pub fn state(&self) -> PromiseState {
        self.shared.inner.lock().state.kind()
    }

    /// The outcome, once settled.
    pub fn settlement(&self) -> Option<Settlement<T, E>> {
        self.shared.inner.lock().state.settlement()
    }

    /// The name this promise records its outcome under.
    pub fn name(&self) -> String {
        self.shared.inner.lock().name.clone()
    }

    /// A snapshot of the values accumulated along this promise's ancestry.
    pub fn named_values(&self) -> NamedValues<T, E> {
        self.shared.inner.lock().named.clone()
    }
}

impl<T, E> Promise<T, E> {
    /// Whether both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise<T, E>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn bound_to(&self, scheduler: &Arc<dyn Scheduler>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.shared.scheduler), Arc::as_ptr(scheduler))
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        match &inner.state {
            State::Pending => write!(f, "Promise {{ <pending> }}"),
            State::Fulfilled(v) => write!(f, "Promise {{ <fulfilled>: {:?} }}", v),
            State::Rejected(e) => write!(f, "Promise {{ <rejected>: {:?} }}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Promise;
    use crate::{Error, Executor, Handler, PromiseState, Resolver, Settlement, TaskQueue};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn executor() -> (Arc<TaskQueue>, Executor) {
        let queue = Arc::new(TaskQueue::new());
        (queue.clone(), Executor::new(queue))
    }

    #[test]
    fn first_settlement_wins() {
        let (_queue, executor) = executor();
        let p: Promise<i32> = Promise::new(
            &executor,
            Resolver::new(|settle| {
                settle.fulfill(1);
                settle.fulfill(2);
                settle.reject(Error::failure("late"));
                Ok(())
            }),
        );
        assert_eq!(p.settlement(), Some(Settlement::Fulfilled(1)));
    }

    #[test]
    fn err_return_rejects_unless_already_settled() {
        let (_queue, executor) = executor();
        let failed: Promise<i32> = Promise::new(
            &executor,
            Resolver::new(|_| Err(Error::failure("thrown"))),
        );
        assert_eq!(
            failed.settlement(),
            Some(Settlement::Rejected(Error::failure("thrown")))
        );

        let kept: Promise<i32> = Promise::new(
            &executor,
            Resolver::new(|settle| {
                settle.fulfill(5);
                Err(Error::failure("ignored"))
            }),
        );
        assert_eq!(kept.settlement(), Some(Settlement::Fulfilled(5)));
    }

    #[test]
    fn panicking_resolver_rejects() {
        let (_queue, executor) = executor();
        let p: Promise<i32> = Promise::new(&executor, Resolver::new(|_| panic!("boom")));
        assert_eq!(
            p.settlement(),
            Some(Settlement::Rejected(Error::Panicked("boom".into())))
        );
    }

    #[test]
    fn resolver_name_keys_named_values() {
        let (_queue, executor) = executor();
        let p: Promise<i32> = Promise::new(
            &executor,
            Resolver::named("load", |settle| {
                settle.fulfill(9);
                Ok(())
            }),
        );
        assert_eq!(p.name(), "load");
        assert_eq!(p.named_values().value("load"), Some(&9));
    }

    #[test]
    fn then_without_matching_handler_returns_same_promise() {
        let (_queue, executor) = executor();
        let ok: Promise<i32> = executor.resolve(1);
        assert!(ok.then(None, None).ptr_eq(&ok));
        assert!(ok.catch(Some(Handler::new(|e: Error, _| Err::<i32, _>(e)))).ptr_eq(&ok));

        let bad: Promise<i32> = executor.reject(Error::failure("x"));
        assert!(bad.then(Some(Handler::new(|v: i32, _| Ok(v))), None).ptr_eq(&bad));
        assert!(!bad.catch(Some(Handler::new(|_, _| Ok(0_i32)))).ptr_eq(&bad));
    }

    #[test]
    fn handlers_never_run_synchronously() {
        let (queue, executor) = executor();
        let ran = Arc::new(Mutex::new(false));
        let p: Promise<i32> = executor.resolve(3);
        let flag = ran.clone();
        let child = p.then(
            Some(Handler::new(move |v: i32, _| {
                *flag.lock() = true;
                Ok(v)
            })),
            None,
        );
        assert!(!*ran.lock());
        assert_eq!(child.state(), PromiseState::Pending);
        queue.run_until_idle();
        assert!(*ran.lock());
        assert_eq!(child.state(), PromiseState::Fulfilled);
    }

    #[test]
    fn pass_through_without_handler_while_pending() {
        let (queue, executor) = executor();
        let (settle, p) = executor.pending::<i32, Error>();
        let passed = p.catch(Some(Handler::new(|_, _| Ok(0_i32))));
        settle.fulfill(4);
        // Pass-through settles the child synchronously with the parent.
        assert_eq!(passed.settlement(), Some(Settlement::Fulfilled(4)));
        queue.run_until_idle();
        assert_eq!(passed.settlement(), Some(Settlement::Fulfilled(4)));
    }

    #[test]
    fn long_pass_through_chain_settles() {
        let (queue, executor) = executor();
        let (settle, root) = executor.pending::<i32, Error>();
        let mut tail = root.clone();
        for _ in 0..100_000 {
            tail = tail.catch(Some(Handler::new(|_, _| Ok(0_i32))));
        }
        settle.fulfill(7);
        assert_eq!(tail.settlement(), Some(Settlement::Fulfilled(7)));
        queue.run_until_idle();
        assert!(queue.is_empty());
        assert_eq!(tail.named_values().value(""), Some(&7));
    }

    #[test]
    fn debug_output() {
        let (_queue, executor) = executor();
        let p: Promise<i32> = executor.resolve(2);
        assert_eq!(format!("{:?}", p), "Promise { <fulfilled>: 2 }");
        let (_settle, q) = executor.pending::<i32, Error>();
        assert_eq!(format!("{:?}", q), "Promise { <pending> }");
    }
}
