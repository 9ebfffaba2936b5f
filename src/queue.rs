//! Blocking FIFO hand-off queue
//!
//! A mutex-protected `VecDeque` that many producers push into and many
//! consumers pull from. Consumers block until an item is available; each
//! item is delivered to exactly one consumer, in insertion order.
//!
//! Both plain OS threads ([`BlockingQueue::blocking_receive`]) and async
//! tasks ([`BlockingQueue::receive`]) may wait on the same queue. Every
//! `send` wakes at most one waiter of each kind; a woken waiter that loses
//! the race for the item simply goes back to waiting.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::QueueError;

/// Unbounded, thread-safe FIFO queue with blocking receive.
pub struct BlockingQueue<T> {
    /// Pending items, head at the front
    items: Mutex<VecDeque<T>>,
    /// Wakes OS threads parked in `blocking_receive`
    available: Condvar,
    /// Wakes tasks suspended in `receive`
    notify: Notify,
}

impl<T> BlockingQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Appends `item` to the tail and wakes one waiting consumer.
    pub fn send(&self, item: T) {
        self.lock().push_back(item);
        self.available.notify_one();
        self.notify.notify_one();
    }

    /// Removes and returns the head without waiting.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Suspends the calling task until an item is available, then removes
    /// and returns the head.
    ///
    /// Never returns on a queue nobody sends to. Cancel-safe: dropping the
    /// future before completion never loses an item.
    pub async fn receive(&self) -> T {
        loop {
            // Register interest before checking so a send between the
            // check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_receive() {
                return item;
            }

            notified.await;
        }
    }

    /// Like [`receive`](Self::receive), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Timeout`] if no item arrived in time.
    pub async fn receive_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        tokio::time::timeout(timeout, self.receive())
            .await
            .map_err(|_| QueueError::Timeout(timeout))
    }

    /// Blocks the calling OS thread until an item is available, then
    /// removes and returns the head.
    ///
    /// Must not be called from an async task; use [`receive`](Self::receive)
    /// there instead.
    pub fn blocking_receive(&self) -> T {
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = self
                .available
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`blocking_receive`](Self::blocking_receive), giving up after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Timeout`] if no item arrived in time.
    pub fn blocking_receive_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        let items = self.lock();
        let (mut items, _) = self
            .available
            .wait_timeout_while(items, timeout, |q| q.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        items.pop_front().ok_or(QueueError::Timeout(timeout))
    }

    /// Returns the number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no items are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // `VecDeque` push/pop cannot leave the deque torn, so a poisoned lock
    // still guards a consistent sequence.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_new_queue_is_empty() {
        let queue: BlockingQueue<u32> = BlockingQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.try_receive(), None);
    }

    #[test]
    fn test_fifo_single_receiver() {
        let queue = BlockingQueue::new();
        queue.send("a");
        queue.send("b");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.blocking_receive(), "a");
        assert_eq!(queue.blocking_receive(), "b");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_receive_leaves_remaining_in_order() {
        let queue = BlockingQueue::new();
        for i in 0..5 {
            queue.send(i);
        }
        assert_eq!(queue.try_receive(), Some(0));
        assert_eq!(queue.len(), 4);
        let rest: Vec<i32> = std::iter::from_fn(|| queue.try_receive()).collect();
        assert_eq!(rest, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_async_receive_pending_until_send() {
        let queue = BlockingQueue::new();
        let mut fut = task::spawn(queue.receive());

        assert_pending!(fut.poll());
        assert_pending!(fut.poll());

        queue.send(7);
        assert!(fut.is_woken());
        assert_eq!(assert_ready!(fut.poll()), 7);
    }

    #[test]
    fn test_dropped_receive_does_not_lose_item() {
        let queue = BlockingQueue::new();
        {
            let mut fut = task::spawn(queue.receive());
            assert_pending!(fut.poll());
        }
        queue.send(1);
        assert_eq!(queue.try_receive(), Some(1));
    }

    #[test]
    fn test_blocking_receive_waits_for_send() {
        let queue = Arc::new(BlockingQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.send(42);
        });

        assert_eq!(queue.blocking_receive(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn test_blocking_receive_timeout_on_empty() {
        let queue: BlockingQueue<u8> = BlockingQueue::new();
        let result = queue.blocking_receive_timeout(Duration::from_millis(20));
        assert_eq!(result, Err(QueueError::Timeout(Duration::from_millis(20))));
    }

    #[test]
    fn test_blocking_receive_timeout_with_item() {
        let queue = BlockingQueue::new();
        queue.send(3);
        assert_eq!(queue.blocking_receive_timeout(Duration::from_millis(20)), Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_timeout_on_empty() {
        let queue: BlockingQueue<u8> = BlockingQueue::new();
        let result = queue.receive_timeout(Duration::from_secs(1)).await;
        assert_eq!(result, Err(QueueError::Timeout(Duration::from_secs(1))));
    }

    #[test]
    fn test_exactly_once_across_threads() {
        const RECEIVERS: usize = 4;
        const ITEMS: usize = 1000;

        let queue = Arc::new(BlockingQueue::new());
        let mut handles = vec![];

        for _ in 0..RECEIVERS {
            let q = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                (0..ITEMS / RECEIVERS)
                    .map(|_| q.blocking_receive())
                    .collect::<Vec<usize>>()
            }));
        }

        for i in 0..ITEMS {
            queue.send(i);
        }

        let mut received: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        received.sort_unstable();
        assert_eq!(received, (0..ITEMS).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_across_tasks() {
        let queue = Arc::new(BlockingQueue::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let q = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                for _ in 0..50 {
                    got.push(q.receive().await);
                }
                got
            }));
        }

        for i in 0..400_u32 {
            queue.send(i);
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let got = handle.await.unwrap();
            // Each receiver sees its own items in push order.
            assert!(got.windows(2).all(|w| w[0] < w[1]));
            for item in got {
                assert!(seen.insert(item), "item {item} delivered twice");
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mixed_thread_and_task_receivers() {
        let queue = Arc::new(BlockingQueue::new());

        let q = Arc::clone(&queue);
        let thread_rx = thread::spawn(move || q.blocking_receive());
        let q = Arc::clone(&queue);
        let task_rx = tokio::spawn(async move { q.receive().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.send(1_u8);
        queue.send(2_u8);

        let a = task_rx.await.unwrap();
        let b = tokio::task::spawn_blocking(move || thread_rx.join().unwrap())
            .await
            .unwrap();
        let mut both = [a, b];
        both.sort_unstable();
        assert_eq!(both, [1, 2]);
    }

    #[test]
    fn test_debug_output() {
        let queue = BlockingQueue::new();
        queue.send(1);
        let debug = format!("{queue:?}");
        assert!(debug.contains("BlockingQueue"));
        assert!(debug.contains("len: 1"));
    }

    proptest! {
        #[test]
        fn prop_single_receiver_sees_push_order(items in proptest::collection::vec(any::<u16>(), 0..64)) {
            let queue = BlockingQueue::new();
            for item in &items {
                queue.send(*item);
            }
            let drained: Vec<u16> = std::iter::from_fn(|| queue.try_receive()).collect();
            prop_assert_eq!(drained, items);
        }
    }
}
