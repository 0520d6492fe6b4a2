//! One-shot countdown barriers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;

/// A one-shot barrier that releases its waiters when a counter reaches zero.
///
/// A `CountdownLatch` lets one or more threads block until a fixed amount of
/// work, spread across other threads, has finished. Each unit of work calls
/// [`count_down`] as it completes; threads in [`wait`] resume once the
/// counter hits zero.
///
/// The counter only ever moves toward zero. Calling `count_down` on a latch
/// that is already at zero is a no-op, and there is no way to raise the count
/// again — a latch is used once and a new one is created for the next round.
/// A latch created with a count of zero is born released.
///
/// [`count_down`]: #method.count_down
/// [`wait`]: #method.wait
///
/// # Example
///
/// ```
/// use syncopate::CountdownLatch;
/// use std::sync::Arc;
/// use std::thread;
///
/// let workers = 5;
/// let latch = Arc::new(CountdownLatch::new(workers));
///
/// for _ in 0..workers {
///     let latch = Arc::clone(&latch);
///     thread::spawn(move || {
///         // ... perform this worker's share ...
///         latch.count_down();
///     });
/// }
///
/// latch.wait();
/// assert_eq!(latch.count(), 0);
/// ```
pub struct CountdownLatch {
    count: AtomicUsize,
    waiting: SegQueue<thread::Thread>,
}

impl CountdownLatch {
    /// Creates a new latch that releases after `count` calls to
    /// [`count_down`](#method.count_down).
    pub fn new(count: usize) -> CountdownLatch {
        CountdownLatch {
            count: AtomicUsize::new(count),
            waiting: SegQueue::new(),
        }
    }

    /// Returns the current counter value.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Decrements the counter by one, waking every waiter if this call
    /// brought it to zero.
    ///
    /// Returns `true` only for the call that reached zero. Calling this on a
    /// latch that is already at zero does nothing and returns `false`.
    pub fn count_down(&self) -> bool {
        let mut current = self.count.load(Ordering::SeqCst);

        loop {
            if current == 0 {
                return false;
            }

            match self.count.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    current -= 1;
                    break;
                }
                Err(seen) => current = seen,
            }
        }

        if current == 0 {
            while let Some(thread) = self.waiting.pop() {
                thread.unpark();
            }
            true
        } else {
            false
        }
    }

    /// Blocks the current thread until the counter reaches zero.
    ///
    /// Returns immediately if the counter is already at zero.
    pub fn wait(&self) {
        // Enqueue the handle before the first check: if the check came first,
        // the releasing thread could drain the queue between our check and
        // our park, and the wakeup would be lost.
        self.waiting.push(thread::current());

        let mut first = true;
        while self.count() > 0 {
            if first {
                first = false;
            } else {
                self.waiting.push(thread::current());
            }

            thread::park();
        }
    }

    /// Blocks until the counter reaches zero or the timeout elapses,
    /// whichever comes first.
    ///
    /// Returns `true` if the counter reached zero within the timeout. A
    /// `false` return leaves the latch untouched; the caller may wait again.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        // see `wait` for why the handle goes in before the first check
        self.waiting.push(thread::current());

        let begin = Instant::now();
        let mut first = true;
        let mut remaining = timeout;
        loop {
            if self.count() == 0 {
                return true;
            }

            if first {
                first = false;
            } else {
                let elapsed = begin.elapsed();
                if elapsed >= timeout {
                    return self.count() == 0;
                }
                remaining = timeout - elapsed;

                self.waiting.push(thread::current());
            }

            thread::park_timeout(remaining);
        }
    }
}
