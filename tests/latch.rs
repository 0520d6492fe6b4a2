//! Release behavior of `CountdownLatch`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use syncopate::CountdownLatch;

#[test]
fn waiters_resume_only_after_the_full_count() {
    const WORKERS: usize = 4;

    let latch = Arc::new(CountdownLatch::new(WORKERS));
    let completed = Arc::new(AtomicUsize::new(0));

    for n in 0..WORKERS {
        let latch = Arc::clone(&latch);
        let completed = Arc::clone(&completed);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10 * n as u64));
            completed.fetch_add(1, Ordering::SeqCst);
            latch.count_down();
        });
    }

    latch.wait();
    // count_down happens-after the increment, so wait() resuming means all
    // the work is visible
    assert_eq!(completed.load(Ordering::SeqCst), WORKERS);

    // extra decrements past zero are no-ops
    assert!(!latch.count_down());
    assert_eq!(latch.count(), 0);
    latch.wait();
}

#[test]
fn timed_wait_reports_whether_zero_was_reached() {
    let latch = Arc::new(CountdownLatch::new(1));

    assert!(!latch.wait_timeout(Duration::from_millis(50)));
    assert_eq!(latch.count(), 1);

    let releaser = {
        let latch = Arc::clone(&latch);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            latch.count_down()
        })
    };

    assert!(latch.wait_timeout(Duration::from_secs(2)));
    assert!(releaser.join().unwrap());
}

#[test]
fn many_waiters_release_together() {
    let latch = Arc::new(CountdownLatch::new(1));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let latch = Arc::clone(&latch);
            thread::spawn(move || latch.wait())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    latch.count_down();

    for handle in handles {
        handle.join().unwrap();
    }
}
