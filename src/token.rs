//! Cancellation tokens for bounding a blocking wait.
//!
//! A token cancels *the wait*, never the future: triggering it unblocks any
//! `wait` call racing against it and leaves the future untouched, so it can
//! be waited on again with a fresh token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a [`wait`](crate::Future::wait) call returned without the future's
/// outcome. Distinct from the error carried by the future itself: a caller
/// seeing this may simply wait again.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The token's deadline passed before the future settled.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// [`CancelToken::cancel`] was called before the future settled.
    #[error("wait canceled")]
    Canceled,
}

/// Something parked on a condition variable that a token can wake early.
pub(crate) trait Wake: Send + Sync {
    fn wake(&self);
}

/// Caller-supplied handle that can abort a `wait` independently of the
/// future's own completion, either by deadline or by an explicit
/// [`cancel`](CancelToken::cancel).
///
/// Clones share state: one clone can be handed to a waiting thread while
/// another cancels it.
///
/// # Examples
///
/// ```
/// use promissory::{promise, CancelToken, WaitError};
/// use std::time::Duration;
///
/// let (_producer, future) = promise::<u32, String>();
/// let token = CancelToken::with_timeout(Duration::from_millis(10));
/// assert_eq!(future.wait(&token), Err(WaitError::DeadlineExceeded));
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    deadline: Option<Instant>,
    canceled: AtomicBool,
    waiters: Mutex<Vec<Weak<dyn Wake>>>,
}

impl std::fmt::Debug for TokenInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInner")
            .field("deadline", &self.deadline)
            .field("canceled", &self.canceled)
            .finish()
    }
}

impl CancelToken {
    fn with_opt_deadline(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                deadline,
                canceled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A token with no deadline. A wait against it blocks until the future
    /// settles or [`cancel`](Self::cancel) is called.
    pub fn never() -> Self {
        Self::with_opt_deadline(None)
    }

    /// A token that triggers once `deadline` passes.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::with_opt_deadline(Some(deadline))
    }

    /// A token that triggers `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Triggers the token, unblocking every wait currently racing against
    /// it. Idempotent; has no effect on any future's state.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
        let waiters = self.inner.waiters.lock().unwrap();
        for waiter in waiters.iter() {
            if let Some(waiter) = waiter.upgrade() {
                waiter.wake();
            }
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called. Does not reflect
    /// deadline expiry.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Current trigger state: `None` while the token is still live.
    /// Explicit cancellation wins over a passed deadline.
    pub(crate) fn status(&self) -> Option<WaitError> {
        if self.is_canceled() {
            return Some(WaitError::Canceled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(WaitError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Time left until the deadline, or `None` for a deadline-less token.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Registers a waiter to be woken by [`cancel`](Self::cancel). Dead
    /// registrations are pruned here; the weak reference never extends the
    /// waiter's lifetime.
    pub(crate) fn register(&self, waiter: Weak<dyn Wake>) {
        let mut waiters = self.inner.waiters.lock().unwrap();
        waiters.retain(|w| w.upgrade().is_some());
        waiters.push(waiter);
    }
}
