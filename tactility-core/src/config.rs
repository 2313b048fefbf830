//! Kernel configuration constants for the host port.
//!
//! This module centralizes the tunables that FreeRTOS keeps in
//! `FreeRTOSConfig.h` and that the Tactility wrappers hard-code, so that the
//! wrappers and the port agree on a single value.
//!
//! | Constant                                | Value    | Used by             |
//! |-----------------------------------------|----------|---------------------|
//! | [`TICK_RATE_HZ`]                        | 1000     | kernel, port        |
//! | [`TIMER_QUEUE_LENGTH`]                  | 16       | timer service       |
//! | [`DISPATCHER_BACKPRESSURE_WARNING_COUNT`] | 100    | dispatcher          |
//! | [`DISPATCHER_THREAD_POLL_TICKS`]        | 1000     | dispatcher thread   |

use crate::kernel::TickType;

/// Scheduler tick frequency in Hz (1 tick = 1 ms).
pub const TICK_RATE_HZ: u32 = 1000;

/// Size of one stack word in bytes (`StackType_t` on ESP32).
pub const STACK_WORD_SIZE: usize = 4;

/// Largest stack depth in words that a task may request.
pub const MAX_STACK_DEPTH: usize = u16::MAX as usize;

/// Lower bound for the stack of a host thread.
///
/// Host frames are much larger than Xtensa/RISC-V frames, so requested stack
/// sizes are raised to this value when the task is spawned.
pub const HOST_MIN_STACK_SIZE: usize = 64 * 1024;

/// Default stack size in bytes for threads created without an explicit size.
pub const DEFAULT_STACK_SIZE: usize = 4096;

/// Capacity of the timer service's pending-call queue.
pub const TIMER_QUEUE_LENGTH: usize = 16;

/// Name of the timer service task.
pub const TIMER_SERVICE_NAME: &str = "Tmr Svc";

/// Stack size in bytes of the timer service task.
pub const TIMER_SERVICE_STACK_SIZE: usize = 4096;

/// Queue length at which a dispatcher logs its backpressure warning.
pub const DISPATCHER_BACKPRESSURE_WARNING_COUNT: usize = 100;

/// Lock timeout used for each item while a dispatcher drains its queue.
pub const DISPATCHER_CONSUME_LOCK_TIMEOUT: TickType = 10;

/// How long a dispatcher thread waits for work before re-checking its
/// interrupt flag.
pub const DISPATCHER_THREAD_POLL_TICKS: TickType = 1000;

/// Bit used by a dispatcher to signal "queue is non-empty".
pub const DISPATCHER_WAIT_FLAG: u32 = 1;
