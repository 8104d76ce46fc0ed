use std::{collections::VecDeque, sync::{Arc, Condvar, Mutex, MutexGuard}, time::Duration};

use crossbeam::{channel::SendError, utils::Backoff};

use crate::{cancel::CancelToken, handoff::Received};

/// How long a parked consumer sleeps before checking again whether it has been cancelled.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// How the consumer of a shared queue waits when the queue is empty but not yet closed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum WaitStrategy {
    /// Retry straight away without yielding, burning CPU for as long as the producer is slow.
    Spin,
    /// Spin briefly, then start yielding the thread, using crossbeam's exponential backoff.
    Backoff,
    /// Sleep on a condition variable until the producer enqueues something or closes the queue.
    Park,
}

/// Result of a single non-blocking look at a shared queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue<T> {
    Item(T),
    /// Nothing available right now, but the producer might add more.
    Empty,
    /// Nothing available and the producer has finished, so there will never be anything more.
    Closed,
}

/// An unbounded FIFO queue shared between one producer thread and one consumer thread.
///
/// The items and the closed flag live behind the same lock, so every operation sees a consistent
/// view of both. In particular there is no way to observe "closed" while items remain, because
/// `try_dequeue_or_observe_closed` checks both under a single lock acquisition.
pub struct SharedQueue<T> {
    state: Mutex<QueueState<T>>,
    /// Notified whenever an item is added or the queue is closed.
    changed: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Set once by the producer, after which nothing more is enqueued.
    closed: bool,
    /// Set if the consumer goes away, so the producer can stop rather than fill memory forever.
    consumer_dropped: bool,
}

impl<T> SharedQueue<T> {
    pub fn new() -> Self {
        SharedQueue {
            state: Mutex::new(QueueState { items: VecDeque::new(), closed: false, consumer_dropped: false }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().expect("Shared queue lock poisoned")
    }

    /// Adds an item to the back of the queue. Never blocks (other than on the lock).
    /// Fails, handing the item back, if the queue has been closed or the consumer has gone.
    pub fn enqueue(&self, item: T) -> Result<(), SendError<T>> {
        let mut state = self.lock();
        if state.closed || state.consumer_dropped {
            return Err(SendError(item));
        }
        state.items.push_back(item);
        drop(state);
        self.changed.notify_one();
        Ok(())
    }

    /// Marks the queue as closed. Items already in the queue can still be dequeued.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    /// Takes the front item, or reports whether the queue is merely empty or finished for good.
    pub fn try_dequeue_or_observe_closed(&self) -> Dequeue<T> {
        Self::take_front(&mut self.lock())
    }

    /// As `try_dequeue_or_observe_closed`, but if the queue is empty and open, waits (without
    /// spinning) up to `timeout` for that to change.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeue<T> {
        let state = self.lock();
        let (mut state, _) = self.changed
            .wait_timeout_while(state, timeout, |s| s.items.is_empty() && !s.closed)
            .expect("Shared queue lock poisoned");
        Self::take_front(&mut state)
    }

    fn take_front(state: &mut QueueState<T>) -> Dequeue<T> {
        match state.items.pop_front() {
            Some(x) => Dequeue::Item(x),
            None if state.closed => Dequeue::Closed,
            None => Dequeue::Empty,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn is_closed_and_empty(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    fn disconnect_consumer(&self) {
        let mut state = self.lock();
        state.consumer_dropped = true;
        state.items.clear();
    }
}

impl<T> Default for SharedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a shared queue and returns the producer and consumer ends of it.
/// Dropping the producer end closes the queue; dropping the consumer end makes further sends fail.
pub fn new<T>(wait: WaitStrategy) -> (QueueSender<T>, QueueReceiver<T>) {
    let queue = Arc::new(SharedQueue::new());
    (
        QueueSender { queue: queue.clone() },
        QueueReceiver { queue, wait },
    )
}

pub struct QueueSender<T> {
    queue: Arc<SharedQueue<T>>,
}

impl<T> QueueSender<T> {
    /// Never blocks, as the queue is unbounded.
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.queue.enqueue(item)
    }
}

impl<T> Drop for QueueSender<T> {
    fn drop(&mut self) {
        self.queue.close();
    }
}

pub struct QueueReceiver<T> {
    queue: Arc<SharedQueue<T>>,
    wait: WaitStrategy,
}

impl<T> QueueReceiver<T> {
    /// Gets the next item, waiting according to our WaitStrategy while the queue is empty.
    /// Returns Closed only once the queue is both closed and drained.
    pub fn recv(&self, cancel: &CancelToken) -> Received<T> {
        let backoff = Backoff::new();
        loop {
            if cancel.is_cancelled() {
                return Received::Cancelled;
            }

            let attempt = match self.wait {
                WaitStrategy::Park => self.queue.dequeue_timeout(CANCEL_CHECK_INTERVAL),
                WaitStrategy::Spin | WaitStrategy::Backoff => self.queue.try_dequeue_or_observe_closed(),
            };
            match attempt {
                Dequeue::Item(x) => return Received::Item(x),
                Dequeue::Closed => return Received::Closed,
                // Spin goes straight round again, and Park has already waited inside dequeue_timeout
                Dequeue::Empty => if self.wait == WaitStrategy::Backoff {
                    backoff.snooze();
                },
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn is_closed_and_empty(&self) -> bool {
        self.queue.is_closed_and_empty()
    }
}

impl<T> Drop for QueueReceiver<T> {
    fn drop(&mut self) {
        self.queue.disconnect_consumer();
    }
}
