use futures::executor::block_on;
use promissory::{promise, CancelToken, WaitError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn concurrent_waiters_all_observe_the_same_outcome() {
    let (producer, future) = promise::<u32, String>();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let future = future.clone();
            thread::spawn(move || future.wait(&CancelToken::never()))
        })
        .collect();

    // Give the waiters a chance to park before the result arrives.
    thread::sleep(Duration::from_millis(20));
    producer.resolve(7);

    for waiter in waiters {
        let outcome = waiter
            .join()
            .expect("a waiter thread has panicked")
            .expect("wait was not canceled");
        assert_eq!(outcome, Ok(Arc::new(7)));
    }
}

#[test]
fn wait_surfaces_the_carried_error_as_the_outcome() {
    let (producer, future) = promise::<u32, String>();
    let waiter = thread::spawn(move || future.wait(&CancelToken::never()));

    producer.reject("exploded".into());

    let outcome = waiter
        .join()
        .expect("the waiter thread has panicked")
        .expect("wait was not canceled");
    assert_eq!(outcome, Err(Arc::new("exploded".into())));
}

#[test]
fn expired_token_returns_immediately_on_a_pending_future() {
    let (_producer, future) = promise::<u32, String>();
    let token = CancelToken::with_timeout(Duration::ZERO);
    thread::sleep(Duration::from_millis(5));

    let started = Instant::now();
    assert_eq!(future.wait(&token), Err(WaitError::DeadlineExceeded));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn deadline_unblocks_a_parked_waiter() {
    let (_producer, future) = promise::<u32, String>();
    let token = CancelToken::with_timeout(Duration::from_millis(30));
    assert_eq!(future.wait(&token), Err(WaitError::DeadlineExceeded));
}

#[test]
fn cancel_unblocks_a_parked_waiter() {
    let (_producer, future) = promise::<u32, String>();
    let token = CancelToken::never();

    let canceler = token.clone();
    let waiter = thread::spawn(move || future.wait(&token));
    thread::sleep(Duration::from_millis(20));
    canceler.cancel();

    assert_eq!(
        waiter.join().expect("the waiter thread has panicked"),
        Err(WaitError::Canceled)
    );
}

#[test]
fn a_canceled_wait_leaves_the_future_waitable() {
    let (producer, future) = promise::<u32, String>();

    let canceled = CancelToken::never();
    canceled.cancel();
    assert_eq!(future.wait(&canceled), Err(WaitError::Canceled));
    assert!(!future.is_done());

    producer.resolve(9);
    let outcome = future
        .wait(&CancelToken::never())
        .expect("wait was not canceled");
    assert_eq!(outcome, Ok(Arc::new(9)));
}

#[test]
fn wait_prefers_the_outcome_once_settled() {
    let (producer, future) = promise::<u32, String>();
    producer.resolve(3);

    // Even a token that triggered long ago loses to a settled future.
    let token = CancelToken::never();
    token.cancel();
    assert_eq!(future.wait(&token), Ok(Ok(Arc::new(3))));
}

#[test]
fn every_cloned_consumer_can_await_the_result() {
    let (producer, future) = promise::<String, String>();
    let second = future.clone();

    let task1 = thread::spawn(move || {
        block_on(async { assert_eq!(*future.await.unwrap(), "🍓") })
    });
    let task2 = thread::spawn(move || {
        block_on(async { assert_eq!(*second.await.unwrap(), "🍓") })
    });
    let task3 = thread::spawn(move || producer.resolve(String::from("🍓")));

    task1.join().expect("the task1 thread has panicked");
    task2.join().expect("the task2 thread has panicked");
    task3.join().expect("the task3 thread has panicked");
}

#[test]
fn awaiting_a_rejected_future_yields_the_error() {
    let (producer, future) = promise::<String, String>();
    let task = thread::spawn(move || {
        block_on(async {
            let outcome = future.await;
            assert_eq!(outcome, Err(Arc::new("reject!!".into())));
        })
    });
    producer.reject("reject!!".into());
    task.join().expect("the task thread has panicked");
}

#[test]
fn blocking_then_chain_across_threads() {
    let (producer, future) = promise::<u32, String>();

    let chained = thread::spawn(move || {
        future
            .then(|value| Ok(value + 1))
            .then(|value| Ok(value * 10))
            .result()
    });

    thread::sleep(Duration::from_millis(20));
    producer.resolve(1);

    assert_eq!(
        chained.join().expect("the chain thread has panicked"),
        Some(Ok(Arc::new(20)))
    );
}
