//! Bounded request queues
//!
//! Requests are batched into a bounded channel and drained once per tick.
//! A full queue never drops a request: it moves to an ordered overflow
//! buffer, and every later push follows it there until the next drain, so
//! requests always come out in the order they were pushed.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// Producer half of a [`RequestQueue`]; cheap to clone.
pub struct RequestSender<T> {
    label: &'static str,
    capacity: usize,
    sender: Sender<T>,
    overflow: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for RequestSender<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            capacity: self.capacity,
            sender: self.sender.clone(),
            overflow: Arc::clone(&self.overflow),
        }
    }
}

impl<T: Send + 'static> RequestSender<T> {
    /// Enqueue a request. Returns false only when the queue's owner is gone
    /// and the request was dropped.
    pub fn push(&self, request: T) -> bool {
        let mut overflow = self.overflow.lock();
        if !overflow.is_empty() {
            overflow.push_back(request);
            return true;
        }
        match self.sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                warn!(
                    queue = self.label,
                    capacity = self.capacity,
                    "request queue full; deferring to overflow until the next drain"
                );
                overflow.push_back(request);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(queue = self.label, "request queue closed; request dropped");
                false
            }
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// Bounded multi-producer queue drained by its owner.
pub struct RequestQueue<T> {
    sender: RequestSender<T>,
    receiver: Receiver<T>,
}

impl<T: Send + 'static> RequestQueue<T> {
    pub fn bounded(label: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender: RequestSender {
                label,
                capacity,
                sender,
                overflow: Arc::new(Mutex::new(VecDeque::new())),
            },
            receiver,
        }
    }

    pub fn sender(&self) -> RequestSender<T> {
        self.sender.clone()
    }

    pub fn push(&self, request: T) -> bool {
        self.sender.push(request)
    }

    /// Take every request pushed before the call, in push order.
    ///
    /// Producers are held off for the duration, so a request pushed
    /// concurrently lands wholly in this batch or wholly in the next.
    pub fn drain_pending(&self) -> Vec<T> {
        let mut overflow = self.sender.overflow.lock();
        let mut drained: Vec<T> = self.receiver.try_iter().collect();
        drained.extend(overflow.drain(..));
        drained
    }

    /// Discard everything pending, returning how many were dropped.
    pub fn clear(&self) -> usize {
        self.drain_pending().len()
    }

    pub fn len(&self) -> usize {
        let overflow = self.sender.overflow.lock();
        self.receiver.len() + overflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests waiting in the overflow buffer.
    pub fn deferred(&self) -> usize {
        self.sender.overflow.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_preserves_order() {
        let queue = RequestQueue::bounded("test", 8);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.drain_pending(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_defers_instead_of_dropping() {
        let queue = RequestQueue::bounded("test", 2);
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert!(queue.push(3));
        assert_eq!(queue.deferred(), 1);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.drain_pending(), vec![1, 2, 3]);
        assert_eq!(queue.deferred(), 0);
    }

    #[test]
    fn test_order_kept_across_drains_with_one_slot() {
        let queue = RequestQueue::bounded("test", 1);
        queue.push("add-a");
        queue.push("add-b");
        assert_eq!(queue.drain_pending(), vec!["add-a", "add-b"]);

        // Channel has room again; a push after a deferral must not overtake it.
        queue.push("remove-b");
        queue.push("add-c");
        queue.push("remove-c");
        assert_eq!(queue.deferred(), 2);
        assert_eq!(queue.drain_pending(), vec!["remove-b", "add-c", "remove-c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_producer_order_kept_across_threads() {
        let queue = RequestQueue::bounded("test", 4);
        let producers: Vec<_> = (0..3u32)
            .map(|p| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for i in 0..50u32 {
                        sender.push((p, i));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let drained = queue.drain_pending();
        assert_eq!(drained.len(), 150);
        for p in 0..3 {
            let seq: Vec<u32> = drained.iter().filter(|(q, _)| *q == p).map(|&(_, i)| i).collect();
            assert_eq!(seq, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_clear_discards_pending() {
        let queue = RequestQueue::bounded("test", 1);
        let sender = queue.sender();
        sender.push("a");
        sender.push("b");
        assert_eq!(queue.clear(), 2);
        assert!(queue.drain_pending().is_empty());
    }

    #[test]
    fn test_push_after_owner_dropped() {
        let queue = RequestQueue::bounded("test", 1);
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.push(1));
    }
}
