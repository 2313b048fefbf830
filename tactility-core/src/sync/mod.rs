//! Synchronization primitives built on the port layer.
//!
//! | Type               | Task | ISR                  | Blocks |
//! |--------------------|------|----------------------|--------|
//! | [`Mutex`]          | yes  | no                   | yes    |
//! | [`RecursiveMutex`] | yes  | no                   | yes    |
//! | [`Semaphore`]      | yes  | `*_from_isr` methods | task only |
//! | [`EventGroup`]     | yes  | `*_from_isr` methods | `wait` only |
//! | [`MessageQueue`]   | yes  | `*_from_isr` methods | task only |
//! | [`StreamBuffer`]   | yes  | `*_from_isr` methods | task only |
//!
//! `Mutex`, `RecursiveMutex` and `Semaphore` implement [`Lock`].

pub mod event_group;
pub mod lock;
pub mod message_queue;
pub mod mutex;
pub mod semaphore;
pub mod stream_buffer;

pub use event_group::{EventGroup, EventGroupError};
pub use lock::{Lock, ScopedLock};
pub use message_queue::MessageQueue;
pub use mutex::{DataGuard, DataMutex, Mutex, MutexGuard, RecursiveMutex};
pub use semaphore::Semaphore;
pub use stream_buffer::StreamBuffer;
