//! Byte stream buffers.
//!
//! Mirrors `xStreamBuffer`: a writer copies in as many bytes as fit, a reader
//! blocked on an empty buffer wakes once the trigger level is reached.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use super::{Deadline, Waited};
use crate::kernel::TickType;

struct Stream {
    bytes: VecDeque<u8>,
    trigger_level: usize,
    blocked: u32,
}

pub(crate) struct RawStreamBuffer {
    stream: Mutex<Stream>,
    size: usize,
    changed: Condvar,
}

impl RawStreamBuffer {
    /// A trigger level of zero behaves as one.
    pub(crate) fn new(size: usize, trigger_level: usize) -> Self {
        debug_assert!(size > 0 && trigger_level <= size);
        Self {
            stream: Mutex::new(Stream {
                bytes: VecDeque::with_capacity(size),
                trigger_level: trigger_level.max(1),
                blocked: 0,
            }),
            size,
            changed: Condvar::new(),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn set_trigger_level(&self, trigger_level: usize) -> bool {
        if trigger_level > self.size {
            return false;
        }
        super::enter(&self.stream).trigger_level = trigger_level.max(1);
        true
    }

    /// Copy as much of `data` as fits.
    ///
    /// With a non-zero `timeout`, waits for room for all of `data` first;
    /// when the wait expires the bytes that fit are still written.
    pub(crate) fn send(&self, data: &[u8], timeout: TickType) -> usize {
        let deadline = Deadline::after(timeout);
        let mut stream = super::enter(&self.stream);
        let wanted = data.len().min(self.size);
        while self.size - stream.bytes.len() < wanted {
            stream.blocked += 1;
            let waited = super::wait_until(&self.changed, stream, deadline);
            let (mut guard, expired) = match waited {
                Waited::Woken(guard) => (guard, false),
                Waited::Expired(guard) => (guard, true),
            };
            guard.blocked -= 1;
            stream = guard;
            if expired {
                break;
            }
        }

        let written = data.len().min(self.size - stream.bytes.len());
        stream.bytes.extend(&data[..written]);
        drop(stream);
        if written > 0 {
            self.changed.notify_all();
        }
        written
    }

    /// Copy up to `buffer.len()` bytes out.
    ///
    /// Only an empty buffer blocks: the wait ends once the trigger level is
    /// reached or `timeout` expires.
    pub(crate) fn receive(&self, buffer: &mut [u8], timeout: TickType) -> usize {
        let deadline = Deadline::after(timeout);
        let mut stream = super::enter(&self.stream);
        if stream.bytes.is_empty() {
            while stream.bytes.len() < stream.trigger_level {
                stream.blocked += 1;
                let waited = super::wait_until(&self.changed, stream, deadline);
                let (mut guard, expired) = match waited {
                    Waited::Woken(guard) => (guard, false),
                    Waited::Expired(guard) => (guard, true),
                };
                guard.blocked -= 1;
                stream = guard;
                if expired {
                    break;
                }
            }
        }

        let read = buffer.len().min(stream.bytes.len());
        for (slot, byte) in buffer.iter_mut().zip(stream.bytes.drain(..read)) {
            *slot = byte;
        }
        drop(stream);
        if read > 0 {
            self.changed.notify_all();
        }
        read
    }

    pub(crate) fn available(&self) -> usize {
        super::enter(&self.stream).bytes.len()
    }

    /// Discard all bytes. Fails while a task is blocked on the buffer.
    pub(crate) fn reset(&self) -> bool {
        let mut stream = super::enter(&self.stream);
        if stream.blocked > 0 {
            return false;
        }
        stream.bytes.clear();
        true
    }
}
