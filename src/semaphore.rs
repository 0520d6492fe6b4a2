//! Counting semaphores.

use std::sync::{Condvar, Mutex as StdMutex};
use std::time::{Duration, Instant};

use crate::util::unpoison;

/// A counting semaphore: a gate that admits only as many threads as it has
/// permits.
///
/// A `Semaphore` tracks a pool of permits. [`acquire`] blocks until a permit
/// is available and takes it; [`release`] puts one back and wakes blocked
/// acquirers whose request may now be satisfiable. Permits are conserved only
/// if callers pair every acquire with a release — the [`access`] method
/// returns a guard that does the pairing on every exit path and is the
/// preferred way to use the semaphore.
///
/// Multi-permit requests ([`acquire_many`] and friends) are granted
/// atomically: either the full amount is taken, or nothing is.
///
/// [`acquire`]: #method.acquire
/// [`release`]: #method.release
/// [`access`]: #method.access
/// [`acquire_many`]: #method.acquire_many
///
/// # Example
///
/// ```
/// use syncopate::Semaphore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let gate = Arc::new(Semaphore::new(2));
/// let mut handles = Vec::new();
///
/// for _ in 0..4 {
///     let gate = Arc::clone(&gate);
///     handles.push(thread::spawn(move || {
///         let _permit = gate.access();
///         // at most two threads are in this section at once
///     }));
/// }
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(gate.available_permits(), 2);
/// ```
pub struct Semaphore {
    initial: usize,
    permits: StdMutex<usize>,
    freed: Condvar,
}

impl Semaphore {
    /// Creates a new `Semaphore` holding the given number of permits.
    pub fn new(permits: usize) -> Semaphore {
        Semaphore {
            initial: permits,
            permits: StdMutex::new(permits),
            freed: Condvar::new(),
        }
    }

    /// Returns the number of permits the semaphore was created with.
    pub fn initial_permits(&self) -> usize {
        self.initial
    }

    /// Returns the number of permits currently available.
    ///
    /// This is a snapshot; by the time the caller looks at it, other threads
    /// may already have acquired or released permits.
    pub fn available_permits(&self) -> usize {
        *unpoison(self.permits.lock())
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        self.acquire_many(1);
    }

    /// Blocks until `amount` permits are available, then takes them all at
    /// once.
    pub fn acquire_many(&self, amount: usize) {
        let mut permits = unpoison(self.permits.lock());
        while *permits < amount {
            permits = unpoison(self.freed.wait(permits));
        }
        *permits -= amount;
    }

    /// Takes a permit if one is available right now. Never blocks.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_many(1)
    }

    /// Takes `amount` permits if they are all available right now. Never
    /// blocks, and takes nothing on failure.
    pub fn try_acquire_many(&self, amount: usize) -> bool {
        let mut permits = unpoison(self.permits.lock());
        if *permits >= amount {
            *permits -= amount;
            true
        } else {
            false
        }
    }

    /// Blocks up to `timeout` for a permit, returning whether one was taken.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        self.try_acquire_many_for(1, timeout)
    }

    /// Blocks up to `timeout` for `amount` permits, returning whether they
    /// were taken. On timeout, no permits are taken.
    pub fn try_acquire_many_for(&self, amount: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let mut permits = unpoison(self.permits.lock());
        while *permits < amount {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            permits = unpoison(self.freed.wait_timeout(permits, deadline - now)).0;
        }
        *permits -= amount;
        true
    }

    /// Returns one permit to the semaphore, waking blocked acquirers.
    pub fn release(&self) {
        self.release_many(1);
    }

    /// Returns `amount` permits to the semaphore.
    ///
    /// Every blocked acquirer is woken so that any whose request is now
    /// satisfiable can proceed; the rest go back to sleep.
    pub fn release_many(&self, amount: usize) {
        let mut permits = unpoison(self.permits.lock());
        *permits += amount;
        self.freed.notify_all();
    }

    /// Acquires one permit and returns a guard that releases it on drop.
    pub fn access(&self) -> SemaphoreGuard<'_> {
        self.access_many(1)
    }

    /// Acquires `amount` permits and returns a guard that releases them on
    /// drop.
    pub fn access_many(&self, amount: usize) -> SemaphoreGuard<'_> {
        self.acquire_many(amount);
        SemaphoreGuard {
            semaphore: self,
            permits: amount,
        }
    }
}

/// A guard holding permits from a borrowed [`Semaphore`], returned to the
/// semaphore when the guard drops.
///
/// See [`Semaphore::access`](struct.Semaphore.html#method.access).
pub struct SemaphoreGuard<'a> {
    semaphore: &'a Semaphore,
    permits: usize,
}

impl<'a> SemaphoreGuard<'a> {
    /// Returns how many permits this guard is holding.
    pub fn permits(&self) -> usize {
        self.permits
    }
}

impl<'a> Drop for SemaphoreGuard<'a> {
    fn drop(&mut self) {
        self.semaphore.release_many(self.permits);
    }
}
