//! Host port: the RTOS services the wrappers are built on.
//!
//! On a device these calls go to FreeRTOS (`xSemaphoreTake`,
//! `xEventGroupWaitBits`, `xTaskCreate`, `xTimerPendFunctionCall`, ...). On the
//! host they are implemented with OS threads and condition variables:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Wrappers (Mutex, Semaphore, EventGroup, Thread, Timer, ...)  │
//! │  - assert execution context                                  │
//! │  - map Status into bool / Option / Result                    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ port (this module)                                           │
//! │  - isr: interrupt-context flag                               │
//! │  - task: task ids, spawning                                  │
//! │  - semaphore / event_group: blocking primitives              │
//! │  - queue / stream_buffer: bounded message and byte queues    │
//! │  - timer_service: timer daemon + pending calls               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! State inside the port is guarded by short critical sections that are
//! never held while a caller blocks.

pub(crate) mod event_group;
pub(crate) mod isr;
pub(crate) mod queue;
pub(crate) mod semaphore;
pub(crate) mod stream_buffer;
pub(crate) mod task;
pub(crate) mod timer_service;

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::kernel::{self, TickType, MAX_TICKS};

/// Point in time at which a blocking call gives up.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    /// Do not block at all.
    Immediate,
    /// Block until this instant.
    At(Instant),
    /// Block until the condition holds.
    Never,
}

impl Deadline {
    /// Deadline for a call made now with a timeout in ticks.
    pub(crate) fn after(timeout: TickType) -> Self {
        match timeout {
            0 => Deadline::Immediate,
            MAX_TICKS => Deadline::Never,
            ticks => Deadline::At(Instant::now() + kernel::ticks_to_duration(ticks)),
        }
    }
}

/// Outcome of one wait step on a condition variable.
pub(crate) enum Waited<'a, T> {
    /// Woken (or spuriously woken) before the deadline; re-check the condition.
    Woken(MutexGuard<'a, T>),
    /// The deadline has passed.
    Expired(MutexGuard<'a, T>),
}

/// Lock a port critical section.
///
/// A panic while holding one of these locks leaves plain data behind, so a
/// poisoned lock is still usable.
#[inline]
pub(crate) fn enter<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait on `condvar` until notified or `deadline` passes.
pub(crate) fn wait_until<'a, T>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    deadline: Deadline,
) -> Waited<'a, T> {
    match deadline {
        Deadline::Immediate => Waited::Expired(guard),
        Deadline::Never => Waited::Woken(condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)),
        Deadline::At(at) => {
            let now = Instant::now();
            if now >= at {
                return Waited::Expired(guard);
            }
            let (guard, _) = condvar
                .wait_timeout(guard, at - now)
                .unwrap_or_else(PoisonError::into_inner);
            Waited::Woken(guard)
        }
    }
}
