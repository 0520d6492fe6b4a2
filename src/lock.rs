//! Exclusive locks, with optional reentrancy, fairness, and condition
//! queues.
//!
//! The two lock types here are deliberately data-free: they guard a critical
//! *section*, not a value, which is what lets several of them coordinate
//! around the same shared state (and also what makes inconsistent lock
//! ordering — and therefore deadlock — expressible, which this crate makes
//! no attempt to prevent).
//!
//! * [`Mutex`] is the plain exclusive lock. It is not reentrant: a thread
//!   that acquires it twice blocks on itself.
//! * [`ReentrantLock`] counts acquisitions by the owning thread and only
//!   frees the lock when the count returns to zero. It can also mint
//!   [`Condition`] queues for wait/signal coordination.
//!
//! [`Mutex`]: struct.Mutex.html
//! [`ReentrantLock`]: struct.ReentrantLock.html
//! [`Condition`]: struct.Condition.html

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::util::unpoison;

/// How often a cancellable acquire re-checks its token while blocked.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// The errors reported by lock and condition operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// An unlock or wait was attempted by a thread that does not currently
    /// own the lock. This covers releasing a free lock, releasing another
    /// thread's lock, releasing a reentrant lock more times than it was
    /// acquired, and waiting on a condition without holding its lock.
    #[error("the calling thread does not hold the lock")]
    NotOwned,
    /// A cancellable acquire observed its token before the lock became
    /// available. The lock was not acquired.
    #[error("the wait was cancelled before the lock was acquired")]
    Interrupted,
}

/// The order in which blocked acquirers are granted a lock.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Fairness {
    /// Blocked threads acquire the lock in strict arrival order. A
    /// non-blocking `try_acquire` only succeeds when no one is queued ahead
    /// of it.
    Fair,
    /// Any blocked or arriving thread may win a freed lock. This is the
    /// default; it allows barging but tends to have higher throughput.
    #[default]
    Unfair,
}

/// Outcome of an internal acquire attempt.
enum Acquired {
    Yes,
    TimedOut,
    Interrupted,
}

/// Per-condition bookkeeping, guarded by the owning lock's state mutex.
#[derive(Default)]
struct CondSlot {
    /// Tickets of threads currently waiting, in arrival order.
    queue: VecDeque<u64>,
    /// Tickets released by a signal whose threads have not yet resumed.
    signaled: Vec<u64>,
}

struct LockState {
    owner: Option<ThreadId>,
    holds: usize,
    /// Arrival queue of acquire tickets; used only in fair mode.
    line: VecDeque<u64>,
    /// Source of tickets for both fair acquisition and condition waits.
    next_ticket: u64,
    conds: Vec<CondSlot>,
}

/// The shared core behind `Mutex` and `ReentrantLock`.
///
/// All bookkeeping lives in one standard mutex; the condvars only ever block
/// and wake, they never guard state of their own.
struct LockCore {
    state: StdMutex<LockState>,
    /// Signalled whenever the lock frees or the fair line shifts.
    freed: Condvar,
    fairness: Fairness,
    reentrant: bool,
}

impl LockCore {
    fn new(fairness: Fairness, reentrant: bool) -> LockCore {
        LockCore {
            state: StdMutex::new(LockState {
                owner: None,
                holds: 0,
                line: VecDeque::new(),
                next_ticket: 0,
                conds: Vec::new(),
            }),
            freed: Condvar::new(),
            fairness,
            reentrant,
        }
    }

    fn take_ticket(state: &mut LockState) -> u64 {
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        ticket
    }

    /// Whether the calling thread may claim the free lock right now.
    /// `ticket` is the caller's place in the fair line, if it holds one.
    fn claimable(&self, state: &LockState, ticket: Option<u64>) -> bool {
        if state.owner.is_some() {
            return false;
        }
        match self.fairness {
            Fairness::Unfair => true,
            Fairness::Fair => match ticket {
                Some(t) => state.line.front() == Some(&t),
                None => state.line.is_empty(),
            },
        }
    }

    /// Drops an abandoned ticket out of the fair line, waking the rest so
    /// the new front re-checks its position.
    fn abandon(&self, state: &mut LockState, ticket: Option<u64>) {
        if let Some(t) = ticket {
            state.line.retain(|&queued| queued != t);
            self.freed.notify_all();
        }
    }

    /// The full acquire loop, entered with the state mutex already held.
    /// Blocks until the lock is claimed, the deadline passes, or the token
    /// is cancelled. Used both by the public acquire paths and by condition
    /// re-acquisition.
    fn acquire_locked<'a>(
        &self,
        mut state: StdMutexGuard<'a, LockState>,
        deadline: Option<Instant>,
        token: Option<&CancellationToken>,
    ) -> (StdMutexGuard<'a, LockState>, Acquired) {
        let me = thread::current().id();

        if self.reentrant && state.owner == Some(me) {
            state.holds += 1;
            return (state, Acquired::Yes);
        }

        if self.claimable(&state, None) {
            state.owner = Some(me);
            state.holds = 1;
            return (state, Acquired::Yes);
        }

        let ticket = match self.fairness {
            Fairness::Fair => {
                let ticket = LockCore::take_ticket(&mut state);
                state.line.push_back(ticket);
                Some(ticket)
            }
            Fairness::Unfair => None,
        };

        loop {
            if self.claimable(&state, ticket) {
                if ticket.is_some() {
                    state.line.pop_front();
                }
                state.owner = Some(me);
                state.holds = 1;
                return (state, Acquired::Yes);
            }

            let now = Instant::now();
            if let Some(deadline) = deadline {
                if now >= deadline {
                    self.abandon(&mut state, ticket);
                    return (state, Acquired::TimedOut);
                }
            }
            if let Some(token) = token {
                if token.is_cancelled() {
                    self.abandon(&mut state, ticket);
                    return (state, Acquired::Interrupted);
                }
            }

            let slice = match (deadline, token.is_some()) {
                (Some(deadline), true) => Some((deadline - now).min(CANCEL_POLL)),
                (Some(deadline), false) => Some(deadline - now),
                (None, true) => Some(CANCEL_POLL),
                (None, false) => None,
            };
            state = match slice {
                Some(slice) => unpoison(self.freed.wait_timeout(state, slice)).0,
                None => unpoison(self.freed.wait(state)),
            };
        }
    }

    fn acquire(&self, deadline: Option<Instant>, token: Option<&CancellationToken>) -> Acquired {
        let state = unpoison(self.state.lock());
        self.acquire_locked(state, deadline, token).1
    }

    fn try_claim(&self) -> bool {
        let me = thread::current().id();
        let mut state = unpoison(self.state.lock());

        if self.reentrant && state.owner == Some(me) {
            state.holds += 1;
            return true;
        }
        if self.claimable(&state, None) {
            state.owner = Some(me);
            state.holds = 1;
            true
        } else {
            false
        }
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut state = unpoison(self.state.lock());
        if state.owner != Some(thread::current().id()) {
            return Err(LockError::NotOwned);
        }

        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            self.freed.notify_all();
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        unpoison(self.state.lock()).owner.is_some()
    }

    /// Current thread's hold count, zero when it is not the owner.
    fn held_count(&self) -> usize {
        let state = unpoison(self.state.lock());
        if state.owner == Some(thread::current().id()) {
            state.holds
        } else {
            0
        }
    }
}

/// An exclusive, non-reentrant lock over a critical section.
///
/// Unlike [`std::sync::Mutex`], this lock does not wrap a value: it guards
/// whatever the caller chooses to only touch while holding it. [`acquire`]
/// returns a [`MutexGuard`] that releases on drop, which keeps the lock
/// balanced on every exit path; the manual [`lock`]/[`unlock`] pair exists
/// for callers whose acquire and release do not nest in one scope.
///
/// The lock is not reentrant. A thread that calls `acquire` while already
/// holding the lock blocks on itself, exactly as two threads with
/// inconsistent lock ordering block on each other — nothing here detects or
/// prevents either.
///
/// [`acquire`]: #method.acquire
/// [`lock`]: #method.lock
/// [`unlock`]: #method.unlock
/// [`MutexGuard`]: struct.MutexGuard.html
///
/// # Example
///
/// ```
/// use syncopate::Mutex;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let lock = Arc::new(Mutex::new());
/// let total = Arc::new(AtomicUsize::new(0));
/// let mut handles = Vec::new();
///
/// for _ in 0..4 {
///     let lock = Arc::clone(&lock);
///     let total = Arc::clone(&total);
///     handles.push(thread::spawn(move || {
///         for _ in 0..100 {
///             let _guard = lock.acquire();
///             // a read-then-write that would race without the lock
///             let current = total.load(Ordering::Relaxed);
///             total.store(current + 1, Ordering::Relaxed);
///         }
///     }));
/// }
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(total.load(Ordering::Relaxed), 400);
/// ```
pub struct Mutex {
    core: LockCore,
}

impl Mutex {
    /// Creates a new, unlocked mutex with the default (unfair) policy.
    pub fn new() -> Mutex {
        Mutex::with_fairness(Fairness::Unfair)
    }

    /// Creates a new, unlocked mutex with the given fairness policy.
    pub fn with_fairness(fairness: Fairness) -> Mutex {
        Mutex {
            core: LockCore::new(fairness, false),
        }
    }

    /// Blocks until the lock is acquired, returning a guard that releases it
    /// on drop.
    pub fn acquire(&self) -> MutexGuard<'_> {
        self.lock();
        MutexGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires the lock only if it is free right now. Never blocks.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_>> {
        self.try_lock().then(|| MutexGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Blocks up to `timeout` for the lock. Returns `None` if it could not
    /// be acquired in time, leaving the lock untouched.
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<MutexGuard<'_>> {
        let deadline = Instant::now() + timeout;
        match self.core.acquire(Some(deadline), None) {
            Acquired::Yes => Some(MutexGuard {
                lock: self,
                _not_send: PhantomData,
            }),
            _ => None,
        }
    }

    /// Blocks for the lock, but gives up if `token` is cancelled first.
    ///
    /// The token is polled while blocked; this is the cooperative stand-in
    /// for interrupting a waiting thread. A lock that is free is claimed
    /// without consulting the token at all.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Interrupted`] if the token was cancelled before
    /// the lock became available. The lock is not acquired in that case.
    pub fn acquire_interruptibly(
        &self,
        token: &CancellationToken,
    ) -> Result<MutexGuard<'_>, LockError> {
        match self.core.acquire(None, Some(token)) {
            Acquired::Yes => Ok(MutexGuard {
                lock: self,
                _not_send: PhantomData,
            }),
            _ => Err(LockError::Interrupted),
        }
    }

    /// Blocks until the lock is acquired, without producing a guard. The
    /// caller is responsible for the matching [`unlock`](#method.unlock).
    pub fn lock(&self) {
        let _ = self.core.acquire(None, None);
    }

    /// Acquires the lock without a guard if it is free right now, returning
    /// whether it was taken.
    pub fn try_lock(&self) -> bool {
        self.core.try_claim()
    }

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotOwned`] if the calling thread does not hold
    /// the lock.
    pub fn unlock(&self) -> Result<(), LockError> {
        self.core.unlock()
    }

    /// Returns whether any thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.core.is_locked()
    }
}

impl Default for Mutex {
    fn default() -> Mutex {
        Mutex::new()
    }
}

/// A guard releasing a borrowed [`Mutex`] on drop.
///
/// The guard stays on the thread that acquired it; ownership of the lock is
/// per-thread, so the guard is neither `Send` nor `Sync`.
pub struct MutexGuard<'a> {
    lock: &'a Mutex,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Drop for MutexGuard<'a> {
    fn drop(&mut self) {
        // the guard's existence proves ownership; a manual unlock behind the
        // guard's back is the caller's own doing
        self.lock.unlock().ok();
    }
}

/// An exclusive lock that its owner may acquire again without blocking.
///
/// A `ReentrantLock` tracks which thread owns it and how many times that
/// thread has acquired it. Re-acquiring increments the count instead of
/// blocking; the lock only frees — and a blocked acquirer only wakes — when
/// the count returns to zero. Releasing more times than acquired fails with
/// [`LockError::NotOwned`].
///
/// A `ReentrantLock` can also mint [`Condition`] queues via
/// [`condition`](#method.condition), giving threads a way to sleep inside a
/// critical section until another thread signals that something changed.
///
/// # Example
///
/// ```
/// use syncopate::ReentrantLock;
///
/// let lock = ReentrantLock::new();
///
/// let outer = lock.acquire();
/// // something the outer section calls also takes the lock; with a plain
/// // Mutex this would self-deadlock
/// let inner = lock.acquire();
/// assert_eq!(lock.hold_count(), 2);
///
/// drop(inner);
/// assert!(lock.is_held_by_current_thread());
/// drop(outer);
/// assert!(!lock.is_locked());
/// ```
pub struct ReentrantLock {
    core: Arc<LockCore>,
}

impl ReentrantLock {
    /// Creates a new, unheld lock with the default (unfair) policy.
    pub fn new() -> ReentrantLock {
        ReentrantLock::with_fairness(Fairness::Unfair)
    }

    /// Creates a new, unheld lock with the given fairness policy.
    pub fn with_fairness(fairness: Fairness) -> ReentrantLock {
        ReentrantLock {
            core: Arc::new(LockCore::new(fairness, true)),
        }
    }

    /// Blocks until the lock is acquired, returning a guard that releases
    /// one hold on drop. Returns immediately if the calling thread already
    /// owns the lock.
    pub fn acquire(&self) -> LockGuard<'_> {
        self.lock();
        LockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires the lock only if it is free or already owned by the calling
    /// thread. Never blocks.
    pub fn try_acquire(&self) -> Option<LockGuard<'_>> {
        self.try_lock().then(|| LockGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Blocks up to `timeout` for the lock. Returns `None` if it could not
    /// be acquired in time, leaving the lock untouched.
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<LockGuard<'_>> {
        let deadline = Instant::now() + timeout;
        match self.core.acquire(Some(deadline), None) {
            Acquired::Yes => Some(LockGuard {
                lock: self,
                _not_send: PhantomData,
            }),
            _ => None,
        }
    }

    /// Blocks for the lock, but gives up if `token` is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Interrupted`] if the token was cancelled before
    /// the lock became available. The lock is not acquired in that case.
    pub fn acquire_interruptibly(
        &self,
        token: &CancellationToken,
    ) -> Result<LockGuard<'_>, LockError> {
        match self.core.acquire(None, Some(token)) {
            Acquired::Yes => Ok(LockGuard {
                lock: self,
                _not_send: PhantomData,
            }),
            _ => Err(LockError::Interrupted),
        }
    }

    /// Blocks until the lock is acquired, without producing a guard. The
    /// caller is responsible for the matching [`unlock`](#method.unlock).
    pub fn lock(&self) {
        let _ = self.core.acquire(None, None);
    }

    /// Acquires the lock without a guard if it is free or already owned by
    /// the calling thread, returning whether a hold was taken.
    pub fn try_lock(&self) -> bool {
        self.core.try_claim()
    }

    /// Releases one hold on the lock. The lock frees, and one blocked
    /// acquirer wakes, only when the hold count returns to zero.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotOwned`] if the calling thread does not hold
    /// the lock — including the case of one release too many.
    pub fn unlock(&self) -> Result<(), LockError> {
        self.core.unlock()
    }

    /// Returns whether any thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.core.is_locked()
    }

    /// Returns how many holds the calling thread has on the lock, or zero if
    /// it is not the owner.
    pub fn hold_count(&self) -> usize {
        self.core.held_count()
    }

    /// Returns whether the calling thread owns the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.core.held_count() > 0
    }

    /// Creates a new [`Condition`] bound to this lock.
    ///
    /// A lock can carry any number of conditions, one per distinct reason to
    /// wait (a bounded buffer wants "not full" and "not empty" as separate
    /// conditions so producers never absorb wakeups meant for consumers).
    /// Create each condition once and share it, wrapped in an `Arc`, among
    /// the coordinating threads.
    pub fn condition(&self) -> Condition {
        let mut state = unpoison(self.core.state.lock());
        state.conds.push(CondSlot::default());
        Condition {
            core: Arc::clone(&self.core),
            wake: Condvar::new(),
            slot: state.conds.len() - 1,
        }
    }
}

impl Default for ReentrantLock {
    fn default() -> ReentrantLock {
        ReentrantLock::new()
    }
}

/// A guard releasing one hold on a borrowed [`ReentrantLock`] on drop.
///
/// Nested guards on the same thread release in any order; the lock frees
/// when the last of them drops. Like [`MutexGuard`], this guard is neither
/// `Send` nor `Sync`.
pub struct LockGuard<'a> {
    lock: &'a ReentrantLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Drop for LockGuard<'a> {
    fn drop(&mut self) {
        self.lock.unlock().ok();
    }
}

/// A wait/signal queue bound to one [`ReentrantLock`].
///
/// [`wait`] atomically parks the calling thread and releases the bound lock
/// in full — the entire hold count — then re-acquires it, restoring the
/// count, before returning. [`signal`] releases the longest-waiting thread;
/// [`signal_all`] releases all of them, each re-competing for the lock as it
/// wakes.
///
/// A signal only ever reaches a thread that was already waiting when it was
/// sent. Even so, wakeups can be spurious from the waiter's point of view
/// (the signalled-about change may have been undone by the time it
/// re-acquires the lock), so `wait` belongs in a loop that re-checks the
/// predicate:
///
/// ```no_run
/// # use std::sync::atomic::{AtomicBool, Ordering};
/// # use syncopate::ReentrantLock;
/// # let lock = ReentrantLock::new();
/// # let ready = lock.condition();
/// # let predicate = AtomicBool::new(false);
/// let guard = lock.acquire();
/// while !predicate.load(Ordering::SeqCst) {
///     ready.wait().unwrap();
/// }
/// ```
///
/// [`wait`]: #method.wait
/// [`signal`]: #method.signal
/// [`signal_all`]: #method.signal_all
///
/// # Example
///
/// ```
/// use syncopate::ReentrantLock;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let lock = Arc::new(ReentrantLock::new());
/// let ready = Arc::new(lock.condition());
/// let flag = Arc::new(AtomicBool::new(false));
///
/// let waiter = {
///     let lock = Arc::clone(&lock);
///     let ready = Arc::clone(&ready);
///     let flag = Arc::clone(&flag);
///     thread::spawn(move || {
///         let _guard = lock.acquire();
///         while !flag.load(Ordering::SeqCst) {
///             ready.wait().unwrap();
///         }
///     })
/// };
///
/// {
///     let _guard = lock.acquire();
///     flag.store(true, Ordering::SeqCst);
///     ready.signal();
/// }
/// waiter.join().unwrap();
/// ```
pub struct Condition {
    core: Arc<LockCore>,
    wake: Condvar,
    slot: usize,
}

impl Condition {
    /// Atomically releases the bound lock and parks until signalled, then
    /// re-acquires the lock before returning.
    ///
    /// The release is total: a thread holding the lock three times deep
    /// gives up all three holds while parked and gets all three back on
    /// return.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotOwned`] if the calling thread does not hold
    /// the bound lock. Nothing is released in that case.
    pub fn wait(&self) -> Result<(), LockError> {
        self.wait_inner(None).map(|_| ())
    }

    /// As [`wait`](#method.wait), but gives up after `timeout`.
    ///
    /// Returns `Ok(true)` if the thread was signalled and `Ok(false)` on
    /// timeout. The lock is re-acquired (with its hold count restored)
    /// before returning in both cases, so a timed-out waiter may safely
    /// re-check its predicate.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotOwned`] if the calling thread does not hold
    /// the bound lock.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, LockError> {
        self.wait_inner(Some(timeout))
    }

    fn wait_inner(&self, timeout: Option<Duration>) -> Result<bool, LockError> {
        let me = thread::current().id();
        let mut state = unpoison(self.core.state.lock());

        if state.owner != Some(me) {
            return Err(LockError::NotOwned);
        }

        // give the lock up entirely, remembering how deep we held it
        let holds = state.holds;
        state.owner = None;
        state.holds = 0;
        self.core.freed.notify_all();

        let ticket = LockCore::take_ticket(&mut state);
        state.conds[self.slot].queue.push_back(ticket);

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut signalled = true;
        loop {
            let slot = &mut state.conds[self.slot];
            if let Some(at) = slot.signaled.iter().position(|&t| t == ticket) {
                slot.signaled.swap_remove(at);
                break;
            }

            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    // not signalled by the cutoff; withdraw from the queue
                    slot.queue.retain(|&t| t != ticket);
                    signalled = false;
                    break;
                }
                state = unpoison(self.wake.wait_timeout(state, deadline - now)).0;
            } else {
                state = unpoison(self.wake.wait(state));
            }
        }

        // re-acquire like any other contender, then restore the hold depth
        let (mut state, _) = self.core.acquire_locked(state, None, None);
        state.holds = holds;

        Ok(signalled)
    }

    /// Releases the longest-waiting thread, if any. A signal sent while no
    /// thread is waiting is discarded, not stored.
    pub fn signal(&self) {
        let mut state = unpoison(self.core.state.lock());
        if let Some(ticket) = state.conds[self.slot].queue.pop_front() {
            state.conds[self.slot].signaled.push(ticket);
            // one condvar serves every waiter on this condition, so wake
            // them all and let the ticket decide who leaves
            self.wake.notify_all();
        }
    }

    /// Releases every currently-waiting thread. Each re-competes for the
    /// bound lock as it wakes.
    pub fn signal_all(&self) {
        let mut state = unpoison(self.core.state.lock());
        let slot = &mut state.conds[self.slot];
        if !slot.queue.is_empty() {
            let released: Vec<u64> = slot.queue.drain(..).collect();
            slot.signaled.extend(released);
            self.wake.notify_all();
        }
    }

    /// Returns how many threads are currently waiting on this condition.
    pub fn waiter_count(&self) -> usize {
        unpoison(self.core.state.lock()).conds[self.slot].queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_without_ownership_is_an_error() {
        let mutex = Mutex::new();
        assert_eq!(mutex.unlock(), Err(LockError::NotOwned));

        let lock = ReentrantLock::new();
        lock.lock();
        lock.lock();
        assert_eq!(lock.hold_count(), 2);
        assert_eq!(lock.unlock(), Ok(()));
        assert_eq!(lock.unlock(), Ok(()));
        // one release too many
        assert_eq!(lock.unlock(), Err(LockError::NotOwned));
    }

    #[test]
    fn mutex_is_not_reentrant() {
        let mutex = Mutex::new();
        let _guard = mutex.acquire();
        // a second acquire on the same thread blocks on itself; the timed
        // variant is the only way to observe that without hanging the test
        assert!(mutex.try_acquire().is_none());
        assert!(mutex.try_acquire_for(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn reentrant_lock_stacks_guards() {
        let lock = ReentrantLock::new();
        let outer = lock.acquire();
        let inner = lock.try_acquire().expect("owner re-acquire never blocks");
        assert_eq!(lock.hold_count(), 2);
        drop(inner);
        assert!(lock.is_held_by_current_thread());
        drop(outer);
        assert!(!lock.is_locked());
    }

    #[test]
    fn wait_without_lock_is_an_error() {
        let lock = ReentrantLock::new();
        let cond = lock.condition();
        assert_eq!(cond.wait(), Err(LockError::NotOwned));
        assert_eq!(
            cond.wait_timeout(Duration::from_millis(5)),
            Err(LockError::NotOwned)
        );
    }

    #[test]
    fn timed_wait_reacquires_on_timeout() {
        let lock = ReentrantLock::new();
        let cond = lock.condition();
        let _guard = lock.acquire();
        assert_eq!(cond.wait_timeout(Duration::from_millis(20)), Ok(false));
        assert!(lock.is_held_by_current_thread());
        assert_eq!(cond.waiter_count(), 0);
    }

    #[test]
    fn signal_with_no_waiters_is_discarded() {
        let lock = ReentrantLock::new();
        let cond = lock.condition();
        cond.signal();
        cond.signal_all();

        // the discarded signal must not satisfy a later wait
        let _guard = lock.acquire();
        assert_eq!(cond.wait_timeout(Duration::from_millis(20)), Ok(false));
    }
}
