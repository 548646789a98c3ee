//! Resolution of a promise by a value, by another promise, or by a foreign
//! promise-like object.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::continuation::Handler;
use crate::error::Error;
use crate::promise::Promise;
use crate::settle::Settle;

/// Something that settles later and reports back through a [`Settle`] handle.
///
/// This is how foreign promise-like types plug into the engine. `then` may call
/// the handle from any thread, at any time, any number of times; only the first
/// call has an effect. An `Err` return or a panic before that first call rejects
/// the assimilating promise.
pub trait Thenable<T, E>: Send {
    fn then(self: Box<Self>, settle: Settle<T, E>) -> Result<(), E>;
}

/// What a resolver or handler settles a promise with.
pub enum Resolution<T, E> {
    /// A plain value; fulfills directly.
    Value(T),
    /// One of this crate's promises; the target adopts its outcome.
    Promise(Promise<T, E>),
    /// A foreign promise-like object; the target adopts its outcome.
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Box::new(thenable))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Promise(promise)
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    fn then(self: Box<Self>, settle: Settle<T, E>) -> Result<(), E> {
        let on_reject = settle.clone();
        Promise::then(
            &self,
            Some(Handler::new(move |value: T, _| {
                settle.fulfill(value.clone());
                Ok(value)
            })),
            Some(Handler::new(move |reason: E, _| {
                on_reject.reject(reason.clone());
                Err::<T, E>(reason)
            })),
        );
        Ok(())
    }
}

/// Settle `target` with `resolution`.
///
/// Plain values fulfill at once. Promises and thenables are assimilated: their
/// `then` is invoked with a fresh latched handle bound to `target`. Resolving a
/// promise with itself rejects it with [`Error::CyclicResolution`].
pub(crate) fn resolve<T, E>(target: &Promise<T, E>, resolution: Resolution<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    let thenable: Box<dyn Thenable<T, E>> = match resolution {
        Resolution::Value(value) => return target.fulfill(value),
        Resolution::Promise(promise) if promise.ptr_eq(target) => {
            debug!(name = %target.name(), "promise resolved with itself");
            return target.reject(Error::CyclicResolution.into());
        }
        Resolution::Promise(promise) => Box::new(promise),
        Resolution::Thenable(thenable) => thenable,
    };
    assimilate(target, thenable);
}

fn assimilate<T, E>(target: &Promise<T, E>, thenable: Box<dyn Thenable<T, E>>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    let settle = Settle::new(target.clone());
    let handle = settle.clone();
    match catch_unwind(AssertUnwindSafe(move || thenable.then(handle))) {
        Ok(Ok(())) => {}
        Ok(Err(reason)) => settle.reject(reason),
        Err(payload) => settle.reject(Error::from_panic(payload).into()),
    }
}
