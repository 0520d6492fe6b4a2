//! Cooperative cancellation flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative stop signal shared between threads.
///
/// A `CancellationToken` is a cloneable handle over a single monotonic flag:
/// once [`cancel`] has been called, every clone observes [`is_cancelled`] as
/// `true` forever. It carries no power to interrupt a thread — long-running
/// work is expected to poll the token at safe points and wind down on its
/// own. Blocking primitives in this crate that accept a token (such as
/// [`Mutex::acquire_interruptibly`]) poll it the same way.
///
/// [`cancel`]: #method.cancel
/// [`is_cancelled`]: #method.is_cancelled
/// [`Mutex::acquire_interruptibly`]: crate::Mutex::acquire_interruptibly
///
/// # Example
///
/// ```
/// use syncopate::CancellationToken;
/// use std::thread;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
///
/// let worker = {
///     let token = token.clone();
///     thread::spawn(move || {
///         let mut ticks = 0u32;
///         while !token.is_cancelled() {
///             ticks += 1;
///             thread::sleep(Duration::from_millis(1));
///         }
///         ticks
///     })
/// };
///
/// thread::sleep(Duration::from_millis(20));
/// token.cancel();
///
/// assert!(worker.join().unwrap() > 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new, un-cancelled token.
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Sets the flag. Idempotent; cancelling an already-cancelled token is a
    /// no-op, not an error.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether the token has been cancelled. Never blocks.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
