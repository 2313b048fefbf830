//! Concurrency core of the Tactility OS framework.
//!
//! This crate provides the synchronization primitives and task abstractions
//! that the Tactility services are built on:
//!
//! - [`sync`]: [`Lock`](sync::Lock), [`Mutex`](sync::Mutex),
//!   [`RecursiveMutex`](sync::RecursiveMutex), [`Semaphore`](sync::Semaphore),
//!   [`EventGroup`](sync::EventGroup), [`MessageQueue`](sync::MessageQueue),
//!   [`StreamBuffer`](sync::StreamBuffer)
//! - [`thread`]: [`Thread`](thread::Thread), a task lifecycle wrapper
//! - [`timer`]: software timers on the shared timer service task
//! - [`pubsub`]: in-process broadcast
//! - [`dispatcher`] and [`dispatcher_thread`]: deferred work queues
//!
//! The primitives run on a host port that emulates the RTOS services with OS
//! threads. Interrupt context is emulated with [`kernel::simulate_isr`].
//!
//! # Execution contexts
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │ Task context                 │      │ Interrupt context            │
//! │  - may block (timeouts)      │      │  - never blocks              │
//! │  - Mutex, Thread, Timer,     │      │  - *_from_isr entry points   │
//! │    Dispatcher, PubSub        │      │    of Semaphore, EventGroup, │
//! │                              │      │    MessageQueue, StreamBuffer│
//! │                              │      │  - Timer pending callbacks   │
//! └──────────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! Calling a task-only operation from interrupt context (or the reverse)
//! panics. All blocking operations take a timeout in ticks;
//! [`kernel::MAX_TICKS`] waits forever.

pub mod config;
pub mod dispatcher;
pub mod dispatcher_thread;
pub mod kernel;
mod port;
pub mod pubsub;
pub mod status;
pub mod sync;
pub mod thread;
pub mod timer;

pub use dispatcher::Dispatcher;
pub use dispatcher_thread::DispatcherThread;
pub use port::task::TaskId;
pub use pubsub::{PubSub, SubscriptionHandle};
pub use status::{KernelResult, Status};
pub use thread::{Priority, Thread};
pub use timer::Timer;
