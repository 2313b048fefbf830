//! Interrupt-context emulation.
//!
//! A device port answers "am I in an interrupt?" from the CPU state
//! (`xPortInIsrContext`). The host port keeps a per-thread nesting depth that
//! [`enter`] raises while it runs a simulated handler.

use std::cell::Cell;

thread_local! {
    static ISR_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Returns `true` while the calling thread runs a simulated interrupt handler.
#[inline]
pub(crate) fn in_isr() -> bool {
    ISR_DEPTH.with(|depth| depth.get() > 0)
}

/// Restores the previous depth even if the handler panics.
struct IsrScope;

impl IsrScope {
    fn new() -> Self {
        ISR_DEPTH.with(|depth| depth.set(depth.get() + 1));
        IsrScope
    }
}

impl Drop for IsrScope {
    fn drop(&mut self) {
        ISR_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Run `handler` as if it were an interrupt service routine.
pub(crate) fn enter<R>(handler: impl FnOnce() -> R) -> R {
    let _scope = IsrScope::new();
    handler()
}
