//! A collection of classic blocking synchronization primitives, and a small
//! task pool built out of them, on top of what the standard library
//! provides.
//!
//! This library contains the pieces that shared-memory coordination between
//! threads is usually assembled from:
//!
//! * [`Mutex`] and [`ReentrantLock`], exclusive locks over a critical
//!   section rather than a value, with scoped guards, timed and cancellable
//!   acquisition, and configurable fairness.
//! * [`Condition`], a wait/signal queue bound to a [`ReentrantLock`], so a
//!   thread can sleep inside a critical section until the state it cares
//!   about changes.
//! * [`Semaphore`], a counting gate that admits only as many threads as it
//!   has permits.
//! * [`CountdownLatch`], a one-shot barrier that releases its waiters when a
//!   counter of outstanding work reaches zero.
//! * [`CancellationToken`], a cooperative stop flag for long-running work.
//! * [`BlockingQueue`], a bounded FIFO channel where full producers and
//!   empty consumers block.
//! * [`TaskPool`], a fixed set of worker threads draining a task queue and
//!   handing results back through [`TaskFuture`]s.
//!
//! Every primitive is safe under real parallel execution and is shared
//! between threads by reference, conventionally an `Arc`. None of them owns
//! the threads that use it, performs any I/O, or keeps process-wide state.
//! Waits can wake spuriously, so every blocking operation here re-checks its
//! condition in a loop — and callers waiting on a [`Condition`] must do the
//! same.
//!
//! One thing this library deliberately does *not* do is protect callers
//! from themselves: two threads taking two locks in opposite order will
//! deadlock, exactly as the same mistake does with any other lock.
//!
//! [`Mutex`]: struct.Mutex.html
//! [`ReentrantLock`]: struct.ReentrantLock.html
//! [`Condition`]: struct.Condition.html
//! [`Semaphore`]: struct.Semaphore.html
//! [`CountdownLatch`]: struct.CountdownLatch.html
//! [`CancellationToken`]: struct.CancellationToken.html
//! [`BlockingQueue`]: struct.BlockingQueue.html
//! [`TaskPool`]: struct.TaskPool.html
//! [`TaskFuture`]: struct.TaskFuture.html

#![deny(missing_docs)]

pub mod cancel;
pub mod latch;
pub mod lock;
pub mod pool;
pub mod queue;
pub mod semaphore;

mod util;

pub use cancel::CancellationToken;
pub use latch::CountdownLatch;
pub use lock::{Condition, Fairness, LockError, LockGuard, Mutex, MutexGuard, ReentrantLock};
pub use pool::{FutureStatus, RejectedError, TaskError, TaskFuture, TaskPool};
pub use queue::BlockingQueue;
pub use semaphore::{Semaphore, SemaphoreGuard};
