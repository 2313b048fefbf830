//! Byte stream from one writer to one reader.
//!
//! Stream buffers suit interrupt-to-task transfers such as UART receive
//! paths. They assume a single writer and a single reader; several writers
//! (or readers) must serialize through their own [`Mutex`](super::Mutex).
//!
//! # Example
//!
//! ```
//! use tactility_core::sync::StreamBuffer;
//!
//! let stream = StreamBuffer::new(8, 1);
//! assert_eq!(stream.send(b"hello world", 0), 8);
//! assert!(stream.is_full());
//!
//! let mut line = [0u8; 5];
//! assert_eq!(stream.receive(&mut line, 0), 5);
//! assert_eq!(&line, b"hello");
//! assert_eq!(stream.available_read_bytes(), 3);
//! ```

use crate::kernel::{self, TickType};
use crate::port::stream_buffer::RawStreamBuffer;

pub struct StreamBuffer {
    raw: RawStreamBuffer,
}

impl StreamBuffer {
    /// Create a buffer holding `size` bytes.
    ///
    /// A reader blocked on an empty buffer is released once `trigger_level`
    /// bytes are available.
    ///
    /// # Panics
    ///
    /// When `size` is zero, `trigger_level > size`, or when called from
    /// interrupt context.
    pub fn new(size: usize, trigger_level: usize) -> Self {
        assert!(!kernel::is_isr(), "stream buffer created in interrupt context");
        assert!(size > 0, "stream buffer size must be non-zero");
        assert!(
            trigger_level <= size,
            "trigger level {trigger_level} exceeds stream buffer size {size}"
        );
        Self {
            raw: RawStreamBuffer::new(size, trigger_level),
        }
    }

    /// Returns `false` (and keeps the old level) when `trigger_level` exceeds
    /// the buffer size.
    pub fn set_trigger_level(&self, trigger_level: usize) -> bool {
        self.raw.set_trigger_level(trigger_level)
    }

    /// Copy `data` into the buffer and return the number of bytes written.
    ///
    /// Waits up to `timeout` ticks for room for all of `data`; whatever fits
    /// once the wait ends is written.
    pub fn send(&self, data: &[u8], timeout: TickType) -> usize {
        assert!(!kernel::is_isr(), "StreamBuffer::send called from interrupt context");
        self.raw.send(data, timeout)
    }

    /// Copy bytes into `buffer` and return the number read.
    ///
    /// Waits up to `timeout` ticks only when the buffer is empty.
    pub fn receive(&self, buffer: &mut [u8], timeout: TickType) -> usize {
        assert!(!kernel::is_isr(), "StreamBuffer::receive called from interrupt context");
        self.raw.receive(buffer, timeout)
    }

    pub fn send_from_isr(&self, data: &[u8]) -> usize {
        assert!(kernel::is_isr(), "StreamBuffer::send_from_isr called from task context");
        self.raw.send(data, 0)
    }

    pub fn receive_from_isr(&self, buffer: &mut [u8]) -> usize {
        assert!(kernel::is_isr(), "StreamBuffer::receive_from_isr called from task context");
        self.raw.receive(buffer, 0)
    }

    pub fn available_read_bytes(&self) -> usize {
        self.raw.available()
    }

    pub fn available_write_bytes(&self) -> usize {
        self.raw.size() - self.raw.available()
    }

    pub fn is_full(&self) -> bool {
        self.available_write_bytes() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.available_read_bytes() == 0
    }

    /// Discard all buffered bytes.
    ///
    /// Returns `false` and leaves the data in place while a task is blocked
    /// sending to or receiving from the buffer.
    pub fn reset(&self) -> bool {
        assert!(!kernel::is_isr(), "StreamBuffer::reset called from interrupt context");
        self.raw.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MAX_TICKS;
    use std::sync::Arc;

    #[test]
    fn isr_writer_task_reader() {
        let stream = Arc::new(StreamBuffer::new(32, 6));
        let reader = {
            let stream = Arc::clone(&stream);
            std::thread::spawn(move || {
                let mut received = Vec::new();
                let mut chunk = [0u8; 32];
                while received.len() < 12 {
                    let read = stream.receive(&mut chunk, MAX_TICKS);
                    received.extend_from_slice(&chunk[..read]);
                }
                received
            })
        };
        for part in [&b"AT+OK\r"[..], &b"\nREADY"[..]] {
            assert_eq!(kernel::simulate_isr(|| stream.send_from_isr(part)), part.len());
        }
        assert_eq!(reader.join().unwrap(), b"AT+OK\r\nREADY");
        assert!(stream.is_empty());
        assert_eq!(stream.available_write_bytes(), 32);
    }

    #[test]
    fn reset_discards_data() {
        let stream = StreamBuffer::new(4, 1);
        assert_eq!(stream.send(b"abcd", 0), 4);
        assert!(stream.reset());
        assert!(stream.is_empty());
        let mut byte = [0u8; 1];
        assert_eq!(kernel::simulate_isr(|| stream.receive_from_isr(&mut byte)), 0);
    }

    #[test]
    #[should_panic(expected = "exceeds stream buffer size")]
    fn trigger_level_above_size_panics() {
        StreamBuffer::new(4, 5);
    }
}
