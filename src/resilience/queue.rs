//! Bounded drop-oldest queue.
//! A backpressure primitive that sheds its oldest item on overflow rather
//! than blocking the producer or rejecting the newest item.

use std::collections::VecDeque;

use parking_lot::Mutex;

pub struct BoundedQueue<T> {
    capacity: usize,
    inner: Mutex<VecDeque<T>>,
    dropped: std::sync::atomic::AtomicU64,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Pushes `item`, evicting the oldest entry first if the queue is full.
    /// Returns the evicted item, if any.
    pub fn push(&self, item: T) -> Option<T> {
        let mut inner = self.inner.lock();
        let evicted = if inner.len() >= self.capacity {
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            inner.pop_front()
        } else {
            None
        };
        inner.push_back(item);
        evicted
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}
