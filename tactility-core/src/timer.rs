//! Software timers running on the shared timer service task.
//!
//! Every [`Timer`] callback runs on the single timer service task, one at a
//! time, in expiry order. Callbacks should be short and must not block.
//!
//! All methods are task-context only, except the pending-call entry point
//! [`Timer::set_pending_callback_from_isr`], which lets an interrupt handler
//! hand work to the timer service without allocating.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use tactility_core::kernel;
//! use tactility_core::timer::{Timer, Type};
//!
//! let ticks = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&ticks);
//! let timer = Timer::new(Type::Periodic, 5, move || {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! assert!(timer.start());
//! kernel::delay_millis(40);
//! assert!(timer.stop());
//! assert!(ticks.load(Ordering::Relaxed) >= 2);
//! ```

use std::sync::Arc;

use crate::kernel::{self, TickType};
use crate::port::timer_service::{self, PendingCall, TimerId};
use crate::thread::Priority;

/// Whether a timer fires once or repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// Fires once, then goes dormant.
    Once,
    /// Fires every interval until stopped.
    Periodic,
}

/// Plain callback for deferred calls: `(context, argument)`.
pub type PendingCallback<C> = fn(&'static C, u32);

pub struct Timer {
    id: TimerId,
}

fn assert_task_context(operation: &str) {
    assert!(!kernel::is_isr(), "Timer::{operation} called from interrupt context");
}

impl Timer {
    /// Register a timer firing `interval` ticks after each (re)start.
    ///
    /// The timer is created dormant; call [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// When `interval` is zero or when called from interrupt context.
    pub fn new(
        timer_type: Type,
        interval: TickType,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        assert_task_context("new");
        assert!(interval > 0, "timer interval must be non-zero");
        let id = timer_service::service().create(
            interval,
            timer_type == Type::Periodic,
            Arc::new(callback),
        );
        Self { id }
    }

    /// Start (or restart) the timer. Returns `true` on success.
    pub fn start(&self) -> bool {
        assert_task_context("start");
        timer_service::service().start(self.id).is_ok()
    }

    /// Stop the timer.
    ///
    /// A callback that has just been triggered may still be running when this
    /// returns.
    pub fn stop(&self) -> bool {
        assert_task_context("stop");
        timer_service::service().stop(self.id).is_ok()
    }

    /// Restart the timer with its current interval.
    pub fn reset(&self) -> bool {
        assert_task_context("reset");
        timer_service::service().start(self.id).is_ok()
    }

    /// Set a new interval and restart the timer with it.
    pub fn reset_with_interval(&self, interval: TickType) -> bool {
        assert_task_context("reset_with_interval");
        timer_service::service()
            .change_period(self.id, interval)
            .is_ok()
    }

    /// Returns `true` while the timer is armed.
    pub fn is_running(&self) -> bool {
        assert_task_context("is_running");
        timer_service::service().is_active(self.id)
    }

    /// Tick count at which the timer next fires, or `None` when dormant.
    pub fn get_expiry_time(&self) -> Option<TickType> {
        assert_task_context("get_expiry_time");
        timer_service::service().expiry_ticks(self.id)
    }

    /// Run `callback(context, arg)` on the timer service task.
    ///
    /// Waits up to `timeout` ticks for room in the service's queue.
    pub fn set_pending_callback<C: Sync + 'static>(
        &self,
        callback: PendingCallback<C>,
        context: &'static C,
        arg: u32,
        timeout: TickType,
    ) -> bool {
        assert_task_context("set_pending_callback");
        timer_service::service()
            .pend_call(PendingCall::new(callback, context, arg), timeout)
            .is_ok()
    }

    /// Interrupt-context variant of
    /// [`set_pending_callback`](Self::set_pending_callback); never waits.
    pub fn set_pending_callback_from_isr<C: Sync + 'static>(
        &self,
        callback: PendingCallback<C>,
        context: &'static C,
        arg: u32,
    ) -> bool {
        assert!(
            kernel::is_isr(),
            "Timer::set_pending_callback_from_isr called from task context"
        );
        timer_service::service()
            .pend_call_from_isr(PendingCall::new(callback, context, arg))
            .is_ok()
    }

    /// Set the priority of the timer service task, which runs all callbacks.
    pub fn set_callback_priority(&self, priority: Priority) {
        assert_task_context("set_callback_priority");
        timer_service::service().set_priority(priority.value());
    }
}

impl Drop for Timer {
    /// Deletes the timer, blocking until a running callback has returned.
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert_task_context("drop");
        }
        timer_service::service().delete(self.id);
    }
}
