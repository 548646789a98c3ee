//! A worker scheduler uses a multi-producer, single-consumer channel as its
//! backend. Every handle feeds the same thread, which runs tasks one at a time in
//! the order they were sent.
//!
use std::{
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};

use crate::error::Error;
use crate::scheduler::{Scheduler, Task};

/// Runs scheduled tasks on one dedicated thread.
///
/// Dropping the scheduler closes the channel; the worker finishes whatever is
/// still queued and exits.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use named_promise::{Executor, Handler, Promise, WorkerScheduler};
/// use futures::channel::oneshot;
/// use futures::executor::block_on;
///
/// let executor = Executor::new(Arc::new(WorkerScheduler::spawn().unwrap()));
/// let (tx, rx) = oneshot::channel();
/// let p: Promise<String> = executor.resolve("🍓".to_string());
/// p.then(Some(Handler::new(move |v: String, _| {
///     let _ = tx.send(v.clone());
///     Ok(v)
/// })), None);
/// assert_eq!(block_on(rx).unwrap(), "🍓");
/// ```
#[derive(Debug)]
pub struct WorkerScheduler {
    sender: Sender<Task>,
}

/// Configures a [`WorkerScheduler`] before its thread starts.
#[derive(Debug, Default)]
pub struct WorkerBuilder {
    name: Option<String>,
}

impl WorkerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn spawn(self) -> io::Result<WorkerScheduler> {
        let (sender, receiver) = channel();
        let mut builder = thread::Builder::new();
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        builder.spawn(move || run(receiver))?;
        Ok(WorkerScheduler { sender })
    }
}

impl WorkerScheduler {
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }

    /// Start a worker with default settings.
    pub fn spawn() -> io::Result<Self> {
        Self::builder().spawn()
    }
}

impl Scheduler for WorkerScheduler {
    fn schedule(&self, task: Task) {
        if self.sender.send(task).is_err() {
            tracing::warn!("worker thread is gone, dropping task");
        }
    }
}

fn run(receiver: Receiver<Task>) {
    tracing::debug!("worker scheduler started");
    while let Ok(task) = receiver.recv() {
        // A panicking task must not take the worker down with it.
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            let err = Error::from_panic(payload);
            tracing::error!(%err, "scheduled task panicked, worker continues");
        }
    }
    tracing::debug!("worker scheduler stopped");
}
