//! Bounded FIFO queues of typed messages.
//!
//! The device equivalent is an `xQueue`. Messages are moved in and out by
//! value; a send that cannot complete hands the message back to the caller.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use super::{Deadline, Waited};
use crate::kernel::TickType;
use crate::status::{self, KernelResult, Status};

pub(crate) struct RawQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> RawQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item`, waiting up to `timeout` ticks for room.
    pub(crate) fn send(&self, item: T, timeout: TickType) -> Result<(), (T, Status)> {
        let deadline = Deadline::after(timeout);
        let mut items = super::enter(&self.items);
        while items.len() >= self.capacity {
            items = match super::wait_until(&self.not_full, items, deadline) {
                Waited::Woken(items) => items,
                Waited::Expired(_) => return Err((item, status::unavailable(timeout))),
            };
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, waiting up to `timeout` ticks for one.
    pub(crate) fn receive(&self, timeout: TickType) -> KernelResult<T> {
        let deadline = Deadline::after(timeout);
        let mut items = super::enter(&self.items);
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.not_full.notify_one();
                return Ok(item);
            }
            items = match super::wait_until(&self.not_empty, items, deadline) {
                Waited::Woken(items) => items,
                Waited::Expired(_) => return Err(status::unavailable(timeout)),
            };
        }
    }

    pub(crate) fn len(&self) -> usize {
        super::enter(&self.items).len()
    }

    /// Drop every queued item and wake blocked senders.
    pub(crate) fn reset(&self) {
        let discarded = std::mem::take(&mut *super::enter(&self.items));
        self.not_full.notify_all();
        drop(discarded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MAX_TICKS;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn full_queue_returns_the_item() {
        let queue = RawQueue::new(2);
        assert!(queue.send(1, 0).is_ok());
        assert!(queue.send(2, 0).is_ok());
        assert_eq!(queue.send(3, 0).err(), Some((3, Status::ErrorResource)));
        assert_eq!(queue.send(4, 5).err(), Some((4, Status::ErrorTimeout)));
        assert_eq!(queue.receive(0), Ok(1));
        assert_eq!(queue.receive(0), Ok(2));
        assert_eq!(queue.receive(0), Err(Status::ErrorResource));
    }

    #[test]
    fn blocked_sender_proceeds_after_receive() {
        let queue = Arc::new(RawQueue::new(1));
        assert!(queue.send(1, 0).is_ok());
        let sender = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.send(2, MAX_TICKS).is_ok())
        };
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(queue.receive(0), Ok(1));
        assert!(sender.join().unwrap());
        assert_eq!(queue.receive(MAX_TICKS), Ok(2));
    }

    #[test]
    fn reset_empties_the_queue() {
        let queue = RawQueue::new(3);
        for value in 0..3 {
            assert!(queue.send(value, 0).is_ok());
        }
        queue.reset();
        assert_eq!(queue.len(), 0);
        assert!(queue.send(9, 0).is_ok());
    }
}
