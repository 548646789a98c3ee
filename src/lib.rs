//! Promises with named ancestry values.
//!
//! A [`Promise`] settles exactly once, fulfilled with a `T` or rejected with an
//! `E`. Continuations attached with [`Promise::then`] always run later, on the
//! [`Scheduler`] the promise was built with, never inside the call that attached
//! them. Promises and foreign [`Thenable`]s returned from handlers are adopted.
//!
//! Every promise also has a name, taken from the named [`Resolver`] or
//! [`Handler`] that produced it. When a promise settles, its outcome is recorded
//! under that name, and the whole map is handed down to its children. Handlers
//! receive the map as [`NamedValues`] and can look up any named ancestor:
//!
//! ```
//! use std::sync::Arc;
//! use named_promise::{Executor, Handler, Promise, Resolver, TaskQueue};
//!
//! let queue = Arc::new(TaskQueue::new());
//! let executor = Executor::new(queue.clone());
//!
//! let greeting: Promise<String> = Promise::new(
//!     &executor,
//!     Resolver::named("user", |settle| {
//!         settle.fulfill("ferris".into());
//!         Ok(())
//!     }),
//! )
//! .then(Some(Handler::named("upper", |v: String, _| Ok(v.to_uppercase()))), None)
//! .then(
//!     Some(Handler::new(|v: String, named| {
//!         let user = named.value("user").cloned().unwrap_or_default();
//!         Ok(format!("{v} ({user})"))
//!     })),
//!     None,
//! );
//!
//! queue.run_until_idle();
//! assert_eq!(
//!     greeting.settlement().map(|s| s.into_result()),
//!     Some(Ok("FERRIS (ferris)".to_string()))
//! );
//! ```
//!
mod channel;
mod combinators;
mod continuation;
mod error;
mod executor;
mod latch;
mod named;
mod promise;
mod scheduler;
mod settle;
mod state;
mod thenable;

pub use channel::{WorkerBuilder, WorkerScheduler};
pub use continuation::Handler;
pub use error::Error;
pub use executor::Executor;
pub use named::NamedValues;
pub use promise::Promise;
pub use scheduler::{Scheduler, Task, TaskQueue};
pub use settle::{Resolver, Settle};
pub use state::{PromiseState, Settlement};
pub use thenable::{Resolution, Thenable};
