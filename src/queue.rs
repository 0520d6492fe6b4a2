//! Bounded blocking FIFO queues.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex as StdMutex};
use std::time::{Duration, Instant};

use crate::util::unpoison;

/// A bounded FIFO channel where full producers and empty consumers block.
///
/// A `BlockingQueue` holds at most `capacity` items. [`put`] blocks while the
/// queue is full and [`take`] blocks while it is empty, so a fast producer
/// and a slow consumer throttle each other instead of growing a backlog or
/// spinning. The non-blocking and timed variants ([`offer`], [`poll`], and
/// friends) cover callers that would rather give up than wait.
///
/// Items come out in exactly the order they went in. When several producers
/// or consumers block at once, the order in which *they* are served is
/// unspecified, but every waiter is woken as its side gains room, so none
/// starves while the other side makes progress.
///
/// [`put`]: #method.put
/// [`take`]: #method.take
/// [`offer`]: #method.offer
/// [`poll`]: #method.poll
///
/// # Example
///
/// ```
/// use syncopate::BlockingQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingQueue::new(4));
///
/// let producer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         for n in 0..8 {
///             queue.put(n);
///         }
///     })
/// };
///
/// let mut received = Vec::new();
/// for _ in 0..8 {
///     received.push(queue.take());
/// }
/// producer.join().unwrap();
///
/// assert_eq!(received, (0..8).collect::<Vec<_>>());
/// ```
pub struct BlockingQueue<T> {
    items: StdMutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Creates a new queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-capacity queue could never hand
    /// an item from a producer to a consumer.
    pub fn new(capacity: usize) -> BlockingQueue<T> {
        assert!(capacity >= 1, "BlockingQueue capacity must be at least 1");

        BlockingQueue {
            items: StdMutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Returns the maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items currently queued.
    pub fn len(&self) -> usize {
        unpoison(self.items.lock()).len()
    }

    /// Returns whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the queue is currently at capacity.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Appends an item to the tail, blocking while the queue is full.
    pub fn put(&self, item: T) {
        let mut items = unpoison(self.items.lock());
        while items.len() == self.capacity {
            items = unpoison(self.not_full.wait(items));
        }
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Removes and returns the head item, blocking while the queue is empty.
    pub fn take(&self) -> T {
        let mut items = unpoison(self.items.lock());
        loop {
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            items = unpoison(self.not_empty.wait(items));
        }
    }

    /// Appends an item if there is room right now. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns the item back to the caller if the queue is full.
    pub fn offer(&self, item: T) -> Result<(), T> {
        let mut items = unpoison(self.items.lock());
        if items.len() == self.capacity {
            return Err(item);
        }
        items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Appends an item, blocking up to `timeout` for room.
    ///
    /// # Errors
    ///
    /// Returns the item back to the caller if the queue stayed full for the
    /// whole timeout.
    pub fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;

        let mut items = unpoison(self.items.lock());
        while items.len() == self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            items = unpoison(self.not_full.wait_timeout(items, deadline - now)).0;
        }
        items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes and returns the head item if there is one right now. Never
    /// blocks.
    pub fn try_take(&self) -> Option<T> {
        let item = unpoison(self.items.lock()).pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Removes and returns the head item, blocking up to `timeout` for one to
    /// arrive. Returns `None` if the queue stayed empty for the whole
    /// timeout.
    pub fn poll(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;

        let mut items = unpoison(self.items.lock());
        loop {
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            items = unpoison(self.not_empty.wait_timeout(items, deadline - now)).0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BlockingQueue;
    use std::time::Duration;

    #[test]
    fn items_come_out_in_order() {
        let queue = BlockingQueue::new(3);
        queue.put('a');
        queue.put('b');
        queue.put('c');
        assert!(queue.is_full());
        assert_eq!(queue.take(), 'a');
        assert_eq!(queue.take(), 'b');
        assert_eq!(queue.take(), 'c');
        assert!(queue.is_empty());
    }

    #[test]
    fn offer_hands_the_item_back_when_full() {
        let queue = BlockingQueue::new(1);
        assert_eq!(queue.offer(1), Ok(()));
        assert_eq!(queue.offer(2), Err(2));
        assert_eq!(queue.offer_timeout(3, Duration::from_millis(10)), Err(3));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn poll_times_out_empty() {
        let queue: BlockingQueue<u8> = BlockingQueue::new(2);
        assert_eq!(queue.try_take(), None);
        assert_eq!(queue.poll(Duration::from_millis(10)), None);
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn zero_capacity_is_rejected() {
        let _ = BlockingQueue::<u8>::new(0);
    }
}
