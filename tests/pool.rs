//! Task submission, result handoff, and shutdown of `TaskPool`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use syncopate::{FutureStatus, TaskError, TaskPool};

#[test]
fn a_task_value_comes_back_through_its_future() {
    let pool = TaskPool::new(2);

    let future = pool.submit(|| 6 * 7).unwrap();
    assert_eq!(future.get(), Ok(42));
    assert_eq!(future.status(), FutureStatus::Completed);

    // the value is handed out exactly once
    assert_eq!(future.get(), Err(TaskError::Retrieved));
}

#[test]
fn a_panicking_task_fails_only_its_own_future() {
    let pool = TaskPool::new(1);

    let bad = pool
        .submit(|| -> u32 { panic!("exploded on purpose") })
        .unwrap();
    let good = pool.submit(|| "still running").unwrap();

    match bad.get() {
        Err(TaskError::Panicked(message)) => assert!(message.contains("exploded on purpose")),
        other => panic!("expected a captured panic, got {other:?}"),
    }
    assert_eq!(bad.status(), FutureStatus::Failed);

    // the worker survived the panic and the pool kept going
    assert_eq!(good.get(), Ok("still running"));
}

#[test]
fn timed_get_leaves_the_result_claimable() {
    let pool = TaskPool::new(1);

    let slow = pool
        .submit(|| {
            thread::sleep(Duration::from_millis(300));
            "worth the wait"
        })
        .unwrap();

    assert_eq!(
        slow.get_timeout(Duration::from_millis(50)),
        Err(TaskError::Timeout)
    );
    assert!(!slow.is_done());

    // the timeout cancelled nothing; the result arrives and is still ours
    assert_eq!(slow.get(), Ok("worth the wait"));
}

#[test]
fn cancelling_a_queued_task_skips_it() {
    let pool = TaskPool::new(1);
    let ran = Arc::new(AtomicBool::new(false));

    // occupy the only worker so the next task sits in the queue
    let blocker = pool
        .submit(|| thread::sleep(Duration::from_millis(200)))
        .unwrap();

    let doomed = {
        let ran = Arc::clone(&ran);
        pool.submit(move || ran.store(true, Ordering::SeqCst))
            .unwrap()
    };

    assert!(doomed.cancel());
    assert_eq!(doomed.status(), FutureStatus::Cancelled);
    // a second cancel reports it did nothing
    assert!(!doomed.cancel());

    blocker.wait();
    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));

    assert!(!ran.load(Ordering::SeqCst), "cancelled task still ran");
    assert_eq!(doomed.get(), Err(TaskError::Cancelled));
}

#[test]
fn shutdown_finishes_queued_work_and_rejects_new_work() {
    let pool = TaskPool::new(2);

    let futures: Vec<_> = (0..10)
        .map(|n| pool.submit(move || n).unwrap())
        .collect();

    pool.shutdown();
    assert!(pool.is_shutdown());
    assert!(pool.submit(|| ()).is_err());

    // everything accepted before shutdown still runs to completion
    for (n, future) in futures.into_iter().enumerate() {
        assert_eq!(future.get(), Ok(n));
    }

    assert!(pool.await_termination(Duration::from_secs(5)));
    assert!(pool.is_terminated());
}

#[test]
fn tasks_accepted_while_shutdown_races_are_never_lost() {
    // several rounds to give the submit/shutdown interleaving room to vary
    for _ in 0..25 {
        let pool = Arc::new(TaskPool::new(1));

        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut accepted = Vec::new();
                for n in 0..64 {
                    match pool.submit(move || n) {
                        Ok(future) => accepted.push((n, future)),
                        Err(_) => break,
                    }
                }
                accepted
            })
        };

        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)));

        // every submission that returned Ok must run; none may sit pending
        // in a pool whose workers have all exited
        for (n, future) in submitter.join().unwrap() {
            assert!(
                future.wait_timeout(Duration::from_secs(2)),
                "an accepted task never ran"
            );
            assert_eq!(future.get(), Ok(n));
        }
    }
}

#[test]
fn await_termination_times_out_while_workers_live() {
    let pool = TaskPool::new(1);
    assert!(!pool.await_termination(Duration::from_millis(50)));
    assert!(!pool.is_terminated());

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
}
