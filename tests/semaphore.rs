//! Concurrency bounds enforced by `Semaphore`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use syncopate::Semaphore;

#[test]
fn at_most_permits_holders_at_once() {
    const PERMITS: usize = 3;
    const THREADS: usize = 16;

    let gate = Arc::new(Semaphore::new(PERMITS));
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                let _permit = gate.access();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                inside.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= PERMITS);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    assert_eq!(gate.available_permits(), PERMITS);
}

#[test]
fn timed_acquire_waits_out_the_timeout_when_starved() {
    let gate = Semaphore::new(1);
    gate.acquire();

    let begin = Instant::now();
    assert!(!gate.try_acquire_for(Duration::from_millis(100)));
    assert!(begin.elapsed() >= Duration::from_millis(90));

    gate.release();
    assert!(gate.try_acquire());
}

#[test]
fn bulk_release_satisfies_a_bulk_acquirer() {
    let gate = Arc::new(Semaphore::new(0));

    let acquirer = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || gate.acquire_many(3))
    };

    // dole the permits out one at a time; the waiter needs all three
    for _ in 0..3 {
        thread::sleep(Duration::from_millis(20));
        gate.release();
    }

    acquirer.join().unwrap();
    assert_eq!(gate.available_permits(), 0);
}
