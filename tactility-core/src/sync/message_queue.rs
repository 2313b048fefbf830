//! Bounded FIFO of messages between tasks and interrupt handlers.
//!
//! # Example
//!
//! ```
//! use tactility_core::sync::MessageQueue;
//!
//! #[derive(Debug, PartialEq)]
//! enum LoaderMessage {
//!     Start(&'static str),
//!     Stop,
//! }
//!
//! let queue = MessageQueue::new(4);
//! queue.put(LoaderMessage::Start("settings"), 0).unwrap();
//! queue.put(LoaderMessage::Stop, 0).unwrap();
//! assert_eq!(queue.count(), 2);
//! assert_eq!(queue.get(0), Some(LoaderMessage::Start("settings")));
//! assert_eq!(queue.get(0), Some(LoaderMessage::Stop));
//! assert_eq!(queue.get(0), None);
//! ```

use crate::kernel::{self, TickType};
use crate::port::queue::RawQueue;

/// A queue holding at most `capacity` messages of type `T`.
///
/// Messages are moved in and out. A `put` that fails returns the message.
pub struct MessageQueue<T> {
    raw: RawQueue<T>,
}

impl<T: Send> MessageQueue<T> {
    /// # Panics
    ///
    /// When `capacity` is zero or when called from interrupt context.
    pub fn new(capacity: usize) -> Self {
        assert!(!kernel::is_isr(), "message queue created in interrupt context");
        assert!(capacity > 0, "message queue capacity must be non-zero");
        Self {
            raw: RawQueue::new(capacity),
        }
    }

    /// Append `message`, waiting up to `timeout` ticks for room.
    pub fn put(&self, message: T, timeout: TickType) -> Result<(), T> {
        assert!(!kernel::is_isr(), "MessageQueue::put called from interrupt context");
        self.raw.send(message, timeout).map_err(|(message, _)| message)
    }

    /// Take the oldest message, waiting up to `timeout` ticks for one.
    pub fn get(&self, timeout: TickType) -> Option<T> {
        assert!(!kernel::is_isr(), "MessageQueue::get called from interrupt context");
        self.raw.receive(timeout).ok()
    }

    /// Append `message` from an interrupt handler; fails at once when full.
    pub fn put_from_isr(&self, message: T) -> Result<(), T> {
        assert!(kernel::is_isr(), "MessageQueue::put_from_isr called from task context");
        self.raw.send(message, 0).map_err(|(message, _)| message)
    }

    pub fn get_from_isr(&self) -> Option<T> {
        assert!(kernel::is_isr(), "MessageQueue::get_from_isr called from task context");
        self.raw.receive(0).ok()
    }

    /// Number of queued messages.
    pub fn count(&self) -> usize {
        self.raw.len()
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Drop every queued message.
    ///
    /// # Panics
    ///
    /// When called from interrupt context.
    pub fn reset(&self) {
        assert!(!kernel::is_isr(), "MessageQueue::reset called from interrupt context");
        self.raw.reset();
    }
}

impl<T> Drop for MessageQueue<T> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(!kernel::is_isr(), "message queue dropped in interrupt context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MAX_TICKS;
    use std::sync::Arc;

    #[test]
    fn full_queue_hands_the_message_back() {
        let queue = MessageQueue::new(1);
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.put(String::from("first"), 0), Ok(()));
        assert_eq!(queue.put(String::from("second"), 5), Err(String::from("second")));
        assert_eq!(queue.count(), 1);
        queue.reset();
        assert_eq!(queue.count(), 0);
    }

    #[test]
    fn interrupt_handler_feeds_a_task() {
        let queue = Arc::new(MessageQueue::new(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || (0..3).map(|_| queue.get(MAX_TICKS)).collect::<Vec<_>>())
        };
        kernel::simulate_isr(|| {
            for value in 1..=3u32 {
                assert_eq!(queue.put_from_isr(value), Ok(()));
            }
        });
        assert_eq!(consumer.join().unwrap(), [Some(1), Some(2), Some(3)]);
        assert_eq!(kernel::simulate_isr(|| queue.get_from_isr()), None);
    }

    #[test]
    #[should_panic(expected = "from interrupt context")]
    fn blocking_get_in_isr_panics() {
        let queue = MessageQueue::<u8>::new(1);
        kernel::simulate_isr(|| queue.get(0));
    }
}
