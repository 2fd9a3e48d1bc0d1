//! A single-assignment future/promise pair.
//!
//! [`promise`] splits one asynchronous result into two handles: a
//! [`Producer`] through which exactly one value-or-error is delivered, and a
//! cloneable [`Future`] through which any number of consumers observe it.
//! Completion is a one-shot broadcast: every blocked [`Future::wait`], every
//! `.await`, and every later reader sees the same settled outcome.
//!
//! The primitive owns no scheduler. [`Future::then`] and [`Future::catch`]
//! block the calling thread until completion, which keeps them composable
//! into any concurrency model; callers wanting non-blocking composition can
//! `.await` the handle instead, since it also implements
//! [`std::future::Future`].
//!
//! Waiting is bounded by a caller-supplied [`CancelToken`] carrying a
//! deadline or an explicit cancel signal. Triggering a token aborts the wait
//! only; the future stays pending and can be waited on again.
//!
//! # Examples
//!
//! ```
//! use promissory::{promise, CancelToken};
//! use std::thread;
//!
//! let (producer, future) = promise::<u32, String>();
//!
//! let worker = thread::spawn(move || producer.resolve(6 * 7));
//!
//! let outcome = future
//!     .wait(&CancelToken::never())
//!     .expect("wait was not canceled");
//! assert_eq!(*outcome.unwrap(), 42);
//! worker.join().expect("the worker thread has panicked");
//! ```

mod future;
mod token;

pub use crate::future::{promise, Future, Producer, Settled};
pub use crate::token::{CancelToken, WaitError};
