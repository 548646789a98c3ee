//! `all` and `race`, built only on [`Executor::resolve`] and [`Promise::then`].
//!
//! Each aggregate is settled through one [`Settle`](crate::Settle) handle shared by
//! every input's continuation; its latch makes the first settling input win.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::continuation::Handler;
use crate::error::Error;
use crate::executor::Executor;
use crate::promise::Promise;
use crate::thenable::Resolution;

struct Gathered<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl Executor {
    /// Fulfill with every input's value, in input order, once all fulfill.
    ///
    /// The first rejection rejects the aggregate; later outcomes are ignored.
    /// An empty input fulfills at once with an empty `Vec`.
    pub fn all<T, E, I>(&self, inputs: I) -> Promise<Vec<T>, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs: Vec<Resolution<T, E>> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return self.resolve(Vec::new());
        }

        let (settle, aggregate) = self.pending::<Vec<T>, E>();
        let gathered = Arc::new(Mutex::new(Gathered {
            slots: vec![None; inputs.len()],
            remaining: inputs.len(),
        }));

        for (index, input) in inputs.into_iter().enumerate() {
            let (on_value, on_reason) = (settle.clone(), settle.clone());
            let gathered = gathered.clone();
            self.resolve(input).then(
                Some(Handler::new(move |value: T, _| {
                    let done = {
                        let mut gathered = gathered.lock();
                        gathered.slots[index] = Some(value.clone());
                        gathered.remaining -= 1;
                        if gathered.remaining == 0 {
                            Some(gathered.slots.iter_mut().filter_map(Option::take).collect())
                        } else {
                            None
                        }
                    };
                    if let Some(values) = done {
                        on_value.fulfill(values);
                    }
                    Ok(value)
                })),
                Some(Handler::new(move |reason: E, _| {
                    on_reason.reject(reason.clone());
                    Err::<T, E>(reason)
                })),
            );
        }
        aggregate
    }

    /// Settle like whichever input settles first.
    ///
    /// The other inputs keep running; their outcomes are discarded. An empty
    /// input fulfills at once with `T::default()`. For a `T` without a
    /// `Default`, use [`Executor::race_or_else`].
    pub fn race<T, E, I>(&self, inputs: I) -> Promise<T, E>
    where
        T: Clone + Default + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        self.race_or_else(inputs, T::default)
    }

    /// Like [`Executor::race`], but an empty input fulfills with `empty()`.
    pub fn race_or_else<T, E, I, F>(&self, inputs: I, empty: F) -> Promise<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + From<Error> + 'static,
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
        F: FnOnce() -> T,
    {
        let inputs: Vec<Resolution<T, E>> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return self.resolve(empty());
        }

        let (settle, aggregate) = self.pending::<T, E>();
        for input in inputs {
            let (on_value, on_reason) = (settle.clone(), settle.clone());
            self.resolve(input).then(
                Some(Handler::new(move |value: T, _| {
                    on_value.fulfill(value.clone());
                    Ok(value)
                })),
                Some(Handler::new(move |reason: E, _| {
                    on_reason.reject(reason.clone());
                    Err::<T, E>(reason)
                })),
            );
        }
        aggregate
    }
}
