//! Mutex-guarded FIFO shared by worker threads.
//!
//! Workers pull until [`WorkQueue::get_work`] comes back empty and then
//! exit; the queue never blocks and never steals.

use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct WorkQueue<T> {
    queue: Mutex<VecDeque<T>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.queue.lock().push_back(item);
    }

    /// Next item in FIFO order, or `None` once the queue is drained.
    pub fn get_work(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Extend<T> for WorkQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.queue.get_mut().extend(iter);
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            queue: Mutex::new(iter.into_iter().collect()),
        }
    }
}
