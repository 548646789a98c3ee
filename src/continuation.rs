//! Continuation records and the deferred unwrapping of handler results.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::trace;

use crate::error::Error;
use crate::named::NamedValues;
use crate::promise::Promise;
use crate::state::Settlement;
use crate::thenable::Resolution;

type HandlerFn<I, T, E> =
    Box<dyn FnOnce(I, &NamedValues<T, E>) -> Result<Resolution<T, E>, E> + Send + 'static>;

/// A continuation passed to [`Promise::then`].
///
/// `I` is what the handler receives: `T` for fulfillment handlers, `E` for
/// rejection handlers. The second argument is the child promise's
/// [`NamedValues`], holding every named ancestor's outcome.
///
/// A handler created with [`Handler::named`] renames the child promise, so the
/// value it produces is recorded under that name for later descendants.
/// Anonymous handlers leave the child's name as it was.
pub struct Handler<I, T, E> {
    name: Option<String>,
    call: HandlerFn<I, T, E>,
}

impl<I, T, E> Handler<I, T, E>
where
    T: 'static,
    E: 'static,
{
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce(I, &NamedValues<T, E>) -> Result<R, E> + Send + 'static,
        R: Into<Resolution<T, E>>,
    {
        Self {
            name: None,
            call: Box::new(move |input: I, named: &NamedValues<T, E>| {
                f(input, named).map(Into::into)
            }),
        }
    }

    pub fn named<F, R>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(I, &NamedValues<T, E>) -> Result<R, E> + Send + 'static,
        R: Into<Resolution<T, E>>,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(f)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A child promise waiting on its parent, with the handlers to run on settlement.
pub(crate) struct Continuation<T, E> {
    child: Promise<T, E>,
    on_fulfilled: Option<Handler<T, T, E>>,
    on_rejected: Option<Handler<E, T, E>>,
}

impl<T, E> Continuation<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    pub(crate) fn new(
        child: Promise<T, E>,
        on_fulfilled: Option<Handler<T, T, E>>,
        on_rejected: Option<Handler<E, T, E>>,
    ) -> Self {
        Self {
            child,
            on_fulfilled,
            on_rejected,
        }
    }

    pub(crate) fn child(&self) -> &Promise<T, E> {
        &self.child
    }

    /// Feed the parent's outcome to the child.
    ///
    /// With a matching handler, the handler is scheduled. Without one, the child
    /// and the outcome it must take immediately are handed back to the caller.
    #[must_use]
    pub(crate) fn dispatch(
        self,
        settlement: Settlement<T, E>,
    ) -> Option<(Promise<T, E>, Settlement<T, E>)> {
        match settlement {
            Settlement::Fulfilled(value) => match self.on_fulfilled {
                Some(handler) => {
                    schedule(self.child, handler, value);
                    None
                }
                None => Some((self.child, Settlement::Fulfilled(value))),
            },
            Settlement::Rejected(reason) => match self.on_rejected {
                Some(handler) => {
                    schedule(self.child, handler, reason);
                    None
                }
                None => Some((self.child, Settlement::Rejected(reason))),
            },
        }
    }
}

fn schedule<I, T, E>(child: Promise<T, E>, handler: Handler<I, T, E>, input: I)
where
    I: Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    if let Some(name) = handler.name() {
        child.rename(name);
    }
    trace!(name = ?handler.name(), "scheduling continuation");
    let scheduler = child.scheduler().clone();
    scheduler.schedule(Box::new(move || run(child, handler, input)));
}

fn run<I, T, E>(child: Promise<T, E>, handler: Handler<I, T, E>, input: I)
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    let named = child.named_values();
    let call = handler.call;
    match catch_unwind(AssertUnwindSafe(move || call(input, &named))) {
        Ok(Ok(resolution)) => child.resolve_with(resolution),
        Ok(Err(reason)) => child.reject(reason),
        Err(payload) => child.reject(Error::from_panic(payload).into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Executor, Handler, Promise, Resolution, Settlement, TaskQueue};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn executor() -> (Arc<TaskQueue>, Executor) {
        let queue = Arc::new(TaskQueue::new());
        (queue.clone(), Executor::new(queue))
    }

    #[test]
    fn handler_error_rejects_child() {
        let (queue, executor) = executor();
        let p: Promise<i32> = executor.resolve(1);
        let child = p.then(
            Some(Handler::new(|_: i32, _| Err::<i32, _>(Error::failure("nope")))),
            None,
        );
        queue.run_until_idle();
        assert_eq!(
            child.settlement(),
            Some(Settlement::Rejected(Error::failure("nope")))
        );
    }

    #[test]
    fn handler_panic_rejects_child() {
        let (queue, executor) = executor();
        let p: Promise<i32> = executor.resolve(1);
        let child = p.then(
            Some(Handler::new(|_: i32, _| -> Result<i32, Error> {
                panic!("handler blew up")
            })),
            None,
        );
        queue.run_until_idle();
        assert_eq!(
            child.settlement(),
            Some(Settlement::Rejected(Error::Panicked("handler blew up".into())))
        );
    }

    #[test]
    fn returning_the_child_is_cyclic() {
        let (queue, executor) = executor();
        let slot: Arc<Mutex<Option<Promise<i32>>>> = Arc::new(Mutex::new(None));
        let p: Promise<i32> = executor.resolve(1);
        let inner = slot.clone();
        let child = p.then(
            Some(Handler::new(move |_: i32, _| {
                let me = inner.lock().take().expect("child stored before handler runs");
                Ok(Resolution::Promise(me))
            })),
            None,
        );
        *slot.lock() = Some(child.clone());
        queue.run_until_idle();
        assert_eq!(
            child.settlement(),
            Some(Settlement::Rejected(Error::CyclicResolution))
        );
    }

    #[test]
    fn named_handler_renames_child_before_running() {
        let (queue, executor) = executor();
        let p: Promise<i32> = executor.resolve(1);
        let child = p.then(Some(Handler::named("double", |v: i32, _| Ok(v * 2))), None);
        assert_eq!(child.name(), "double");
        queue.run_until_idle();
        assert_eq!(child.named_values().value("double"), Some(&2));
    }

    #[test]
    fn rejection_handler_recovers() {
        let (queue, executor) = executor();
        let p: Promise<i32> = executor.reject(Error::failure("lost"));
        let recovered = p.catch(Some(Handler::named("fallback", |e: Error, _| {
            assert_eq!(e, Error::failure("lost"));
            Ok(-1)
        })));
        queue.run_until_idle();
        assert_eq!(recovered.settlement(), Some(Settlement::Fulfilled(-1)));
    }
}
