//! Thread-safe queue of deferred work.
//!
//! Producers call [`Dispatcher::dispatch`] from any task; one consumer task
//! calls [`Dispatcher::consume`] to run the queued functions in FIFO order.
//! The queue is unbounded: at [`DISPATCHER_BACKPRESSURE_WARNING_COUNT`]
//! queued items a warning is logged, but producers are never blocked.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use tactility_core::dispatcher::Dispatcher;
//! use tactility_core::kernel::MAX_TICKS;
//!
//! let order = Arc::new(Mutex::new(Vec::new()));
//! let dispatcher = Dispatcher::new();
//! for step in 1..=3 {
//!     let order = Arc::clone(&order);
//!     assert!(dispatcher.dispatch(move || order.lock().unwrap().push(step), MAX_TICKS));
//! }
//! assert_eq!(dispatcher.consume(MAX_TICKS), 3);
//! assert_eq!(*order.lock().unwrap(), [1, 2, 3]);
//! ```

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use crate::config::{
    DISPATCHER_BACKPRESSURE_WARNING_COUNT, DISPATCHER_CONSUME_LOCK_TIMEOUT, DISPATCHER_WAIT_FLAG,
};
use crate::kernel::TickType;
use crate::port::task;
use crate::sync::{DataMutex, EventGroup};

/// A unit of deferred work.
pub type Function = Box<dyn FnOnce() + Send>;

struct Queue {
    items: VecDeque<Function>,
    shutdown: bool,
}

pub struct Dispatcher {
    queue: DataMutex<Queue>,
    event_flag: EventGroup,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            queue: DataMutex::new(Queue {
                items: VecDeque::new(),
                shutdown: false,
            }),
            event_flag: EventGroup::new(),
        }
    }

    /// Queue `function` to run on the consuming task.
    ///
    /// `timeout` bounds the wait for the queue lock. Returns `false` when the
    /// lock could not be acquired in time or the dispatcher is shutting down.
    pub fn dispatch(&self, function: impl FnOnce() + Send + 'static, timeout: TickType) -> bool {
        {
            let Some(mut queue) = self.queue.lock(timeout) else {
                log::error!("Dispatcher: mutex acquisition timeout");
                return false;
            };

            if queue.shutdown {
                return false;
            }

            queue.items.push_back(Box::new(function));
            if queue.items.len() == DISPATCHER_BACKPRESSURE_WARNING_COUNT {
                log::warn!(
                    "Backpressure: you're not consuming fast enough ({DISPATCHER_BACKPRESSURE_WARNING_COUNT} queued)"
                );
            }
        }

        self.event_flag.set(DISPATCHER_WAIT_FLAG);
        true
    }

    /// Wait up to `timeout` for work, then run queued functions until the
    /// queue is empty.
    ///
    /// `timeout` only bounds the initial wait, not the time spent running
    /// functions. A function that panics is logged and counted, and the
    /// functions after it still run. Returns the number of functions run.
    pub fn consume(&self, timeout: TickType) -> u32 {
        if self
            .event_flag
            .wait(DISPATCHER_WAIT_FLAG, false, true, timeout)
            .is_err()
        {
            return 0;
        }

        let mut consumed = 0;
        loop {
            let Some(mut queue) = self.queue.lock(DISPATCHER_CONSUME_LOCK_TIMEOUT) else {
                log::warn!("Dispatcher: mutex acquisition timeout");
                continue;
            };
            if queue.shutdown {
                break;
            }
            let Some(function) = queue.items.pop_front() else {
                break;
            };
            let more = !queue.items.is_empty();
            // The lock is not held while the function runs.
            drop(queue);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(function)) {
                log::error!(
                    "Dispatcher: function panicked: {}",
                    task::panic_message(payload.as_ref())
                );
            }
            consumed += 1;

            if !more {
                break;
            }
        }
        consumed
    }

    /// Number of queued functions.
    pub fn len(&self) -> usize {
        self.queue.lock_forever().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let queue = self.queue.get_mut();
        queue.shutdown = true;
        if !queue.items.is_empty() {
            log::debug!("Dispatcher dropped with {} queued function(s)", queue.items.len());
        }
    }
}
