//! Binary and counting semaphores usable from tasks and interrupt handlers.
//!
//! Task code calls [`Semaphore::acquire`] / [`Semaphore::release`]; interrupt
//! handlers call the `*_from_isr` variants, which never block. Calling the
//! wrong variant for the current context panics.

use crate::kernel::{self, TickType};
use crate::port::semaphore::RawSemaphore;
use crate::sync::Lock;

/// A semaphore with `max_count` units.
///
/// A `max_count` of 1 gives a binary semaphore.
pub struct Semaphore {
    raw: RawSemaphore,
    max_count: u32,
}

impl Semaphore {
    /// Create a semaphore with `initial` of `max_count` units available.
    ///
    /// # Panics
    ///
    /// When `max_count` is zero, `initial > max_count`, or when called from
    /// interrupt context.
    pub fn new(max_count: u32, initial: u32) -> Self {
        assert!(!kernel::is_isr(), "semaphore created in interrupt context");
        assert!(max_count > 0, "semaphore max count must be non-zero");
        assert!(
            initial <= max_count,
            "semaphore initial count {initial} exceeds max count {max_count}"
        );
        Self {
            raw: RawSemaphore::counting(max_count, initial),
            max_count,
        }
    }

    /// Create a semaphore with all `max_count` units available.
    pub fn new_full(max_count: u32) -> Self {
        Self::new(max_count, max_count)
    }

    /// Take one unit, blocking for up to `timeout` ticks.
    ///
    /// # Panics
    ///
    /// When called from interrupt context; use
    /// [`acquire_from_isr`](Self::acquire_from_isr) there.
    pub fn acquire(&self, timeout: TickType) -> bool {
        assert!(!kernel::is_isr(), "Semaphore::acquire called from interrupt context");
        self.raw.take(timeout).is_ok()
    }

    /// Give one unit back.
    ///
    /// Returns `false` (and changes nothing) when all units are already
    /// available.
    pub fn release(&self) -> bool {
        assert!(!kernel::is_isr(), "Semaphore::release called from interrupt context");
        self.raw.give().is_ok()
    }

    /// Take one unit without blocking, from an interrupt handler.
    pub fn acquire_from_isr(&self) -> bool {
        assert!(kernel::is_isr(), "Semaphore::acquire_from_isr called from task context");
        self.raw.take_from_isr().is_ok()
    }

    /// Give one unit back from an interrupt handler.
    pub fn release_from_isr(&self) -> bool {
        assert!(kernel::is_isr(), "Semaphore::release_from_isr called from task context");
        self.raw.give_from_isr().is_ok()
    }

    /// Units currently available.
    pub fn available(&self) -> u32 {
        assert!(!kernel::is_isr(), "Semaphore::available called from interrupt context");
        self.raw.count()
    }

    pub fn available_from_isr(&self) -> u32 {
        assert!(kernel::is_isr(), "Semaphore::available_from_isr called from task context");
        self.raw.count()
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(!kernel::is_isr(), "semaphore dropped in interrupt context");
        }
    }
}

impl Lock for Semaphore {
    /// Same as [`acquire`](Semaphore::acquire).
    fn lock(&self, timeout: TickType) -> bool {
        self.acquire(timeout)
    }

    /// Same as [`release`](Semaphore::release), ignoring an over-release.
    fn unlock(&self) {
        self.release();
    }
}
