//! Cancellable work queue
//!
//! A FIFO handed between the capture side (producer) and one worker thread
//! (consumer). `interrupt` discards everything still waiting in the queue but
//! cannot touch a task the worker has already pulled out; that task runs to
//! completion. All operations go through the queue's own mutex, so a clear
//! can never interleave with a concurrent push in a way that leaves a stale
//! task behind.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

pub struct CancellableQueue<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> CancellableQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append a task at the tail. Never blocks. Pushes after `close` are
    /// dropped silently; the consumer is already gone.
    pub fn push(&self, task: T) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.items.push_back(task);
        self.ready.notify_one();
    }

    /// Block until a task is available and return it, in FIFO order.
    /// Returns `None` once the queue has been closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.lock();
        loop {
            if let Some(task) = inner.items.pop_front() {
                return Some(task);
            }
            if inner.closed {
                return None;
            }
            inner = self
                .ready
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Discard every task still waiting in the queue and return how many were
    /// dropped. A task already popped by the consumer is not affected.
    /// No-op on an empty queue.
    pub fn interrupt(&self) -> usize {
        let mut inner = self.lock();
        let dropped = inner.items.len();
        inner.items.clear();
        dropped
    }

    /// Close the queue: wakes the consumer so it can drain remaining tasks
    /// and exit its loop.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for CancellableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn pop_returns_tasks_in_fifo_order() {
        let q = CancellableQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn pop_blocks_until_a_task_arrives() {
        let q = Arc::new(CancellableQueue::new());
        let q2 = q.clone();
        let consumer = std::thread::spawn(move || q2.pop());
        std::thread::sleep(Duration::from_millis(50));
        q.push("late");
        assert_eq!(consumer.join().unwrap(), Some("late"));
    }

    #[test]
    fn interrupt_discards_all_pending_tasks() {
        let q = CancellableQueue::new();
        q.push("a");
        q.push("b");
        q.push("c");
        assert_eq!(q.interrupt(), 3);
        assert!(q.is_empty());
    }

    #[test]
    fn interrupt_on_empty_queue_is_a_noop() {
        let q: CancellableQueue<String> = CancellableQueue::new();
        assert_eq!(q.interrupt(), 0);
        assert_eq!(q.interrupt(), 0);
    }

    #[test]
    fn interrupt_does_not_affect_a_task_already_popped() {
        let q = CancellableQueue::new();
        q.push("in-flight");
        q.push("pending");
        let held = q.pop().unwrap();
        assert_eq!(q.interrupt(), 1);
        assert_eq!(held, "in-flight");
        assert!(q.is_empty());
    }

    #[test]
    fn push_after_interrupt_is_visible() {
        let q = CancellableQueue::new();
        q.push("stale");
        q.interrupt();
        q.push("fresh");
        assert_eq!(q.pop(), Some("fresh"));
    }

    #[test]
    fn close_unblocks_a_waiting_consumer() {
        let q: Arc<CancellableQueue<i32>> = Arc::new(CancellableQueue::new());
        let q2 = q.clone();
        let consumer = std::thread::spawn(move || q2.pop());
        std::thread::sleep(Duration::from_millis(50));
        q.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn close_lets_consumer_drain_remaining_tasks() {
        let q = CancellableQueue::new();
        q.push(7);
        q.close();
        assert_eq!(q.pop(), Some(7));
        assert_eq!(q.pop(), None);
        // Pushes after close are dropped.
        q.push(8);
        assert_eq!(q.pop(), None);
    }
}
