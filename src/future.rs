//! The single-assignment future/promise pair.
//!
//! [`promise`] hands back two connected handles: a [`Producer`] that can
//! settle the result exactly once, and a cloneable [`Future`] through which
//! any number of consumers observe, wait for, or chain on that result.
//! Completion is broadcast: every waiter and every `.await` sees the one
//! settled outcome.

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::task::{Poll, Waker};

use crate::token::{CancelToken, Wake, WaitError};

/// The outcome of a settled future, shared among all consumers.
///
/// An `Err` means the asynchronous operation itself failed; it is carried as
/// data, routed into [`Future::catch`] handlers, and never conflated with
/// wait cancellation ([`WaitError`]).
pub type Settled<T, E> = Result<Arc<T>, Arc<E>>;

/// Creates a connected producer/future pair in the pending state.
///
/// # Examples
///
/// ```
/// use promissory::{promise, CancelToken};
/// use std::thread;
///
/// let (producer, future) = promise::<String, String>();
/// let waiter = thread::spawn(move || future.wait(&CancelToken::never()));
/// producer.resolve("🍓".into());
///
/// let outcome = waiter.join().expect("the waiter thread has panicked");
/// assert_eq!(*outcome.unwrap().unwrap(), "🍓");
/// ```
pub fn promise<T, E>() -> (Producer<T, E>, Future<T, E>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            settled: None,
            wakers: Vec::new(),
        }),
        done: Condvar::new(),
    });
    (
        Producer {
            inner: inner.clone(),
        },
        Future { inner },
    )
}

/// The settable half of a pair: the sole authority allowed to settle it.
///
/// Every settle method consumes the producer and the producer is not
/// `Clone`, so delivering a second result is a compile error rather than a
/// runtime race.
#[derive(Debug)]
pub struct Producer<T, E> {
    inner: Arc<Inner<T, E>>,
}

/// The read-only half of a pair: observe, wait for, or chain on the result.
///
/// Clones share the same underlying state; all of them report the same
/// outcome once the producer settles.
#[derive(Debug)]
pub struct Future<T, E> {
    inner: Arc<Inner<T, E>>,
}

#[derive(Debug)]
struct Inner<T, E> {
    state: Mutex<State<T, E>>,
    done: Condvar,
}

#[derive(Debug)]
struct State<T, E> {
    settled: Option<Settled<T, E>>,
    // Every waker registered since the last poll must be woken on settle.
    // Keeping only the most recent one starves all consumers but the last
    // to poll.
    wakers: Vec<Waker>,
}

impl<T, E> Producer<T, E> {
    /// Delivers the result, transitioning the future from pending to
    /// completed and unblocking every current and future waiter.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::promise;
    ///
    /// let (producer, future) = promise::<u32, String>();
    /// producer.settle(Ok(1));
    /// assert!(future.is_done());
    /// ```
    pub fn settle(self, result: Result<T, E>) {
        self.inner.settle(match result {
            Ok(value) => Ok(Arc::new(value)),
            Err(err) => Err(Arc::new(err)),
        });
    }

    /// Settles with a success value.
    pub fn resolve(self, value: T) {
        self.inner.settle(Ok(Arc::new(value)));
    }

    /// Settles with an error.
    pub fn reject(self, err: E) {
        self.inner.settle(Err(Arc::new(err)));
    }
}

impl<T, E> Inner<T, E> {
    fn settle(&self, outcome: Settled<T, E>) {
        let mut state = self.state.lock().unwrap();
        // Unreachable through the public API (settling consumes the
        // producer), but the single-assignment invariant must stay loud.
        assert!(state.settled.is_none(), "future settled twice");
        state.settled = Some(outcome);
        for waker in state.wakers.drain(..) {
            waker.wake();
        }
        drop(state);
        self.done.notify_all();
    }
}

impl<T: Send + Sync, E: Send + Sync> Wake for Inner<T, E> {
    fn wake(&self) {
        // Taking the lock orders this wake after a waiter's last status
        // check: the waiter is either still before its park (and will see
        // the canceled flag) or already parked and receives the notify.
        let _state = self.state.lock().unwrap();
        self.done.notify_all();
    }
}

impl<T, E> Future<T, E> {
    /// A future that is already settled with a success value.
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(Arc::new(value)))
    }

    /// A future that is already settled with an error.
    pub fn rejected(err: E) -> Self {
        Self::settled(Err(Arc::new(err)))
    }

    fn settled(outcome: Settled<T, E>) -> Self {
        Future {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    settled: Some(outcome),
                    wakers: Vec::new(),
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// Whether the producer has settled. Never blocks.
    pub fn is_done(&self) -> bool {
        self.inner.state.lock().unwrap().settled.is_some()
    }

    /// The success value, if settled with one. `None` while pending or
    /// after failure; pair with [`result`](Self::result) to tell those
    /// apart. Never blocks.
    pub fn value(&self) -> Option<Arc<T>> {
        match self.result() {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// The carried error, if settled with one. `None` while pending or
    /// after success. Never blocks.
    pub fn error(&self) -> Option<Arc<E>> {
        match self.result() {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// The settled outcome, or `None` while still pending. Never blocks;
    /// use [`wait`](Self::wait) to block.
    pub fn result(&self) -> Option<Settled<T, E>> {
        self.inner.state.lock().unwrap().settled.clone()
    }

    /// Blocks until settled, then invokes `f` with the success value and
    /// returns a new future settled with `f`'s return. If this future
    /// carries an error, `f` is not invoked and the returned future carries
    /// the same error, so a chain can continue into
    /// [`catch`](Self::catch).
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::promise;
    ///
    /// let (producer, future) = promise::<u32, String>();
    /// producer.resolve(1);
    /// let next = future.then(|value| Ok(value + 1));
    /// assert_eq!(*next.value().unwrap(), 2);
    /// ```
    pub fn then<U>(&self, f: impl FnOnce(&T) -> Result<U, E>) -> Future<U, E> {
        match self.block() {
            Ok(value) => Future::settled(match f(&value) {
                Ok(next) => Ok(Arc::new(next)),
                Err(err) => Err(Arc::new(err)),
            }),
            Err(err) => Future::settled(Err(err)),
        }
    }

    /// Blocks until settled, then invokes `f` with the carried error, if
    /// any. Returns the same future unchanged, so `then(..).catch(..)`
    /// chains mirror try/catch over the asynchronous boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::Future;
    ///
    /// let future = Future::<u32, String>::rejected("💥".into());
    /// let mut seen = None;
    /// let _ = future.catch(|err| seen = Some(err.clone()));
    /// assert_eq!(seen.as_deref(), Some("💥"));
    /// ```
    pub fn catch(&self, f: impl FnOnce(&E)) -> Future<T, E> {
        if let Err(err) = self.block() {
            f(&err);
        }
        self.clone()
    }

    /// Blocks until settled with no cancellation. Backs `then`/`catch`.
    fn block(&self) -> Settled<T, E> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(outcome) = &state.settled {
                return outcome.clone();
            }
            state = self.inner.done.wait(state).unwrap();
        }
    }
}

impl<T, E> Future<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Blocks until the future settles or `token` triggers, whichever comes
    /// first, and returns exactly one of the two outcomes.
    ///
    /// `Err` reports that *this wait* was canceled, not that the operation
    /// failed; the future's own state is untouched and may be waited on
    /// again with a fresh token. A failed operation is the `Ok(Err(..))`
    /// case.
    pub fn wait(&self, token: &CancelToken) -> Result<Settled<T, E>, WaitError> {
        let waiter: Weak<Inner<T, E>> = Arc::downgrade(&self.inner);
        token.register(waiter);
        let mut state = self.inner.state.lock().unwrap();
        loop {
            // Settled-ness is checked first, so a settle racing a token
            // trigger resolves to the settled outcome.
            if let Some(outcome) = &state.settled {
                return Ok(outcome.clone());
            }
            if let Some(err) = token.status() {
                return Err(err);
            }
            state = match token.remaining() {
                Some(left) => self.inner.done.wait_timeout(state, left).unwrap().0,
                None => self.inner.done.wait(state).unwrap(),
            };
        }
    }
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Future {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> std::future::Future for Future<T, E> {
    type Output = Settled<T, E>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock().unwrap();
        match &state.settled {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                state.wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
