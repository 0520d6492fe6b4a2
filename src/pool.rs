//! A fixed-size task pool with future-style result handoff.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex as StdMutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::latch::CountdownLatch;
use crate::queue::BlockingQueue;
use crate::util::unpoison;

/// How long an idle worker waits on the queue before re-checking for
/// shutdown.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Pending-task backlog for pools built with [`TaskPool::new`].
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a submitted task currently stands.
///
/// A task starts `Pending` and moves to exactly one of the other three
/// states, where it stays: `Completed` when it returned a value, `Failed`
/// when it panicked, `Cancelled` when [`TaskFuture::cancel`] got there
/// first.
///
/// [`TaskFuture::cancel`]: struct.TaskFuture.html#method.cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureStatus {
    /// The task is queued or running; no outcome yet.
    Pending,
    /// The task finished and its value is (or was) available.
    Completed,
    /// The task panicked; the panic is held as [`TaskError::Panicked`].
    Failed,
    /// The task was cancelled before it ran.
    Cancelled,
}

/// The ways retrieving a task's result can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task panicked while running. The payload's message is captured
    /// here; it never unwinds into the worker or the retrieving thread.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was cancelled before a worker ran it.
    #[error("task was cancelled before it ran")]
    Cancelled,
    /// A timed retrieval found the task still pending. The task keeps
    /// running and its result stays claimable.
    #[error("timed out waiting for the task result")]
    Timeout,
    /// The result was already claimed by an earlier retrieval. A task's
    /// value is handed out exactly once.
    #[error("the task result was already retrieved")]
    Retrieved,
}

/// Error returned when submitting to a pool that has begun shutting down.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("task submitted to a pool that has shut down")]
pub struct RejectedError;

struct FutureState<T> {
    status: FutureStatus,
    result: Option<Result<T, TaskError>>,
}

struct FutureShared<T> {
    state: StdMutex<FutureState<T>>,
    done: Condvar,
}

impl<T> FutureShared<T> {
    fn new() -> FutureShared<T> {
        FutureShared {
            state: StdMutex::new(FutureState {
                status: FutureStatus::Pending,
                result: None,
            }),
            done: Condvar::new(),
        }
    }

    /// Records the task's outcome, unless a cancel got there first.
    fn finish(&self, result: Result<T, TaskError>) {
        let mut state = unpoison(self.state.lock());
        if state.status != FutureStatus::Pending {
            return;
        }
        state.status = match result {
            Ok(_) => FutureStatus::Completed,
            Err(_) => FutureStatus::Failed,
        };
        state.result = Some(result);
        self.done.notify_all();
    }
}

/// A placeholder for the result of a task submitted to a [`TaskPool`].
///
/// The worker that runs the task fills the future in; any thread holding the
/// future can poll it ([`status`], [`is_done`]), block on it ([`wait`],
/// [`get`]), or give up on it ([`cancel`]). The task's value is handed out
/// exactly once: the first successful [`get`] takes it, and later calls
/// report [`TaskError::Retrieved`].
///
/// A task that panics does not poison anything — the panic is captured into
/// the future and re-surfaces only as [`TaskError::Panicked`] from `get`.
///
/// [`status`]: #method.status
/// [`is_done`]: #method.is_done
/// [`wait`]: #method.wait
/// [`get`]: #method.get
/// [`cancel`]: #method.cancel
pub struct TaskFuture<T> {
    shared: Arc<FutureShared<T>>,
}

impl<T> TaskFuture<T> {
    /// Returns the task's current status. Never blocks.
    pub fn status(&self) -> FutureStatus {
        unpoison(self.shared.state.lock()).status
    }

    /// Returns whether the task has reached a terminal state. Never blocks.
    pub fn is_done(&self) -> bool {
        self.status() != FutureStatus::Pending
    }

    /// Blocks until the task reaches a terminal state.
    pub fn wait(&self) {
        let mut state = unpoison(self.shared.state.lock());
        while state.status == FutureStatus::Pending {
            state = unpoison(self.shared.done.wait(state));
        }
    }

    /// Blocks up to `timeout` for a terminal state, returning whether one
    /// was reached.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let mut state = unpoison(self.shared.state.lock());
        while state.status == FutureStatus::Pending {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = unpoison(self.shared.done.wait_timeout(state, deadline - now)).0;
        }
        true
    }

    /// Cancels the task if it has not started running, returning whether
    /// this call was the one that cancelled it.
    ///
    /// A cancelled task is skipped by the worker that dequeues it; the
    /// first retrieval reports [`TaskError::Cancelled`] and later ones
    /// [`TaskError::Retrieved`], as with any settled result. Cancelling a
    /// task that already reached a terminal state has no effect.
    pub fn cancel(&self) -> bool {
        let mut state = unpoison(self.shared.state.lock());
        if state.status != FutureStatus::Pending {
            return false;
        }
        state.status = FutureStatus::Cancelled;
        state.result = Some(Err(TaskError::Cancelled));
        self.shared.done.notify_all();
        true
    }

    /// Blocks until the task finishes, then takes its result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Panicked`] if the task panicked,
    /// [`TaskError::Cancelled`] if it was cancelled, and
    /// [`TaskError::Retrieved`] if an earlier `get` already claimed the
    /// value.
    pub fn get(&self) -> Result<T, TaskError> {
        let mut state = unpoison(self.shared.state.lock());
        while state.status == FutureStatus::Pending {
            state = unpoison(self.shared.done.wait(state));
        }
        state.result.take().unwrap_or(Err(TaskError::Retrieved))
    }

    /// As [`get`](#method.get), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Timeout`] if the task was still pending at the
    /// cutoff. The task is *not* cancelled by a timeout; the result stays
    /// claimable by a later retrieval. Otherwise fails as `get` does.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, TaskError> {
        let deadline = Instant::now() + timeout;

        let mut state = unpoison(self.shared.state.lock());
        while state.status == FutureStatus::Pending {
            let now = Instant::now();
            if now >= deadline {
                return Err(TaskError::Timeout);
            }
            state = unpoison(self.shared.done.wait_timeout(state, deadline - now)).0;
        }
        state.result.take().unwrap_or(Err(TaskError::Retrieved))
    }
}

struct PoolShared {
    queue: BlockingQueue<Job>,
    /// Intake gate. `submit` enqueues while holding this and `shutdown`
    /// flips it through this, so a job can never land in the queue unseen
    /// after a worker's final drain check.
    shutting_down: StdMutex<bool>,
    /// Counted down once per worker as it exits; termination == zero.
    exited: CountdownLatch,
}

impl PoolShared {
    fn shutdown_begun(&self) -> bool {
        *unpoison(self.shutting_down.lock())
    }
}

/// A fixed set of worker threads draining a private queue of tasks.
///
/// Tasks go in through [`submit`], which immediately returns a
/// [`TaskFuture`] for the eventual result. Each of the pool's workers loops
/// taking tasks off an internal [`BlockingQueue`](crate::BlockingQueue) and
/// running them; a slow task occupies one worker, never the queue.
///
/// [`shutdown`] stops intake while letting queued and in-flight tasks
/// finish. Workers exit once the queue is drained, which
/// [`await_termination`] can wait for. Dropping the pool requests shutdown
/// the same way but does not wait.
///
/// [`submit`]: #method.submit
/// [`shutdown`]: #method.shutdown
/// [`await_termination`]: #method.await_termination
///
/// # Example
///
/// ```
/// use syncopate::TaskPool;
/// use std::time::Duration;
///
/// let pool = TaskPool::new(3);
///
/// let futures: Vec<_> = (0..6)
///     .map(|n| pool.submit(move || n * n).unwrap())
///     .collect();
///
/// let total: i32 = futures.iter().map(|f| f.get().unwrap()).sum();
/// assert_eq!(total, 55);
///
/// pool.shutdown();
/// assert!(pool.await_termination(Duration::from_secs(5)));
/// ```
pub struct TaskPool {
    shared: Arc<PoolShared>,
    workers: usize,
}

impl TaskPool {
    /// Creates a pool of `workers` threads with a default-sized task queue.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    pub fn new(workers: usize) -> TaskPool {
        TaskPool::with_queue_capacity(workers, DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a pool of `workers` threads whose pending-task queue holds at
    /// most `capacity` tasks. When the backlog is at capacity, [`submit`]
    /// blocks until a worker makes room.
    ///
    /// [`submit`]: #method.submit
    ///
    /// # Panics
    ///
    /// Panics if `workers` or `capacity` is zero.
    pub fn with_queue_capacity(workers: usize, capacity: usize) -> TaskPool {
        assert!(workers >= 1, "TaskPool needs at least one worker");

        let shared = Arc::new(PoolShared {
            queue: BlockingQueue::new(capacity),
            shutting_down: StdMutex::new(false),
            exited: CountdownLatch::new(workers),
        });

        for _ in 0..workers {
            let shared = Arc::clone(&shared);
            thread::spawn(move || worker_loop(&shared));
        }

        TaskPool { shared, workers }
    }

    /// Returns the number of worker threads the pool was created with.
    pub fn pool_size(&self) -> usize {
        self.workers
    }

    /// Returns the number of tasks waiting for a worker. Tasks currently
    /// executing are not counted.
    pub fn queued_tasks(&self) -> usize {
        self.shared.queue.len()
    }

    /// Enqueues a task and returns a future for its result.
    ///
    /// The task runs on some worker thread once one is free; a panic inside
    /// it is captured into the future. If the pending-task queue is at
    /// capacity, `submit` blocks until a worker makes room.
    ///
    /// # Errors
    ///
    /// Returns [`RejectedError`] if [`shutdown`](#method.shutdown) has been
    /// called.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskFuture<T>, RejectedError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::new(FutureShared::new());
        let future = TaskFuture {
            shared: Arc::clone(&shared),
        };

        let job: Job = Box::new(move || {
            // a future cancelled while the task sat in the queue
            if unpoison(shared.state.lock()).status != FutureStatus::Pending {
                return;
            }
            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(value) => shared.finish(Ok(value)),
                Err(payload) => shared.finish(Err(TaskError::Panicked(panic_message(&*payload)))),
            }
        });

        // enqueue while holding the intake gate: a worker that later sees
        // the shutdown flag set is then guaranteed to see this job too, so
        // its final drain check cannot strand an accepted task
        let shutting_down = unpoison(self.shared.shutting_down.lock());
        if *shutting_down {
            return Err(RejectedError);
        }
        self.shared.queue.put(job);
        drop(shutting_down);

        Ok(future)
    }

    /// Begins shutdown: no new tasks are accepted, tasks already queued or
    /// running finish normally, and workers exit once the queue drains.
    /// Idempotent. A `submit` that is blocked waiting for queue room gets
    /// through first; its task counts as accepted.
    pub fn shutdown(&self) {
        *unpoison(self.shared.shutting_down.lock()) = true;
    }

    /// Returns whether shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown_begun()
    }

    /// Returns whether every worker has exited.
    pub fn is_terminated(&self) -> bool {
        self.shared.exited.count() == 0
    }

    /// Blocks up to `timeout` for every worker to exit, returning whether
    /// they all did. Workers only exit after [`shutdown`](#method.shutdown).
    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.shared.exited.wait_timeout(timeout)
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        match shared.queue.poll(IDLE_POLL) {
            Some(job) => job(),
            // drain fully before exiting; the intake gate ensures every
            // accepted job is visible once the flag reads true here
            None => {
                if shared.shutdown_begun() && shared.queue.is_empty() {
                    break;
                }
            }
        }
    }
    shared.exited.count_down();
}

/// Renders a caught panic payload the way `std` prints one.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
