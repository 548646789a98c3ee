//! Deferred task submission.
//!
//! The engine never runs a continuation inside the call that triggered it; it
//! hands a [`Task`] to a [`Scheduler`] instead. Schedulers are injected through
//! [`Executor::new`](crate::Executor::new).

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Accepts tasks and runs them later, in submission order.
///
/// Implementations must never run `task` before `schedule` returns.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Task);
}

/// A deterministic FIFO scheduler that runs only when asked to.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use named_promise::{Executor, Promise, TaskQueue};
///
/// let queue = Arc::new(TaskQueue::new());
/// let executor = Executor::new(queue.clone());
/// let p: Promise<i32> = executor.resolve(1);
/// let doubled = p.then(Some(named_promise::Handler::new(|v: i32, _| Ok(v * 2))), None);
/// assert!(!doubled.state().is_settled());
/// queue.run_until_idle();
/// assert_eq!(doubled.settlement().map(|s| s.into_result()), Some(Ok(2)));
/// ```
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the oldest queued task. Returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        // The guard must be released before the task runs; tasks schedule more tasks.
        let next = self.tasks.lock().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks queued meanwhile.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}
