//! 32-bit event groups.

use std::sync::{Condvar, Mutex};

use super::{Deadline, Waited};
use crate::kernel::TickType;
use crate::status::{self, KernelResult};

/// A 32-bit mask with blocking waits on any-of / all-of predicates.
pub(crate) struct RawEventGroup {
    bits: Mutex<u32>,
    changed: Condvar,
}

impl RawEventGroup {
    pub(crate) fn new() -> Self {
        Self {
            bits: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// OR `flags` into the mask and wake all waiters.
    ///
    /// Returns the mask after setting.
    pub(crate) fn set(&self, flags: u32) -> u32 {
        let result = {
            let mut bits = super::enter(&self.bits);
            *bits |= flags;
            *bits
        };
        self.changed.notify_all();
        result
    }

    /// Clear `flags` from the mask.
    ///
    /// Returns the mask as it was before clearing.
    pub(crate) fn clear(&self, flags: u32) -> u32 {
        let mut bits = super::enter(&self.bits);
        let before = *bits;
        *bits &= !flags;
        before
    }

    pub(crate) fn get(&self) -> u32 {
        *super::enter(&self.bits)
    }

    /// Block until the predicate over `flags` holds or `timeout` expires.
    ///
    /// On success returns the mask as observed when the predicate held (before
    /// any clearing). With `clear_on_exit` only the awaited `flags` are cleared.
    pub(crate) fn wait_bits(
        &self,
        flags: u32,
        clear_on_exit: bool,
        wait_all: bool,
        timeout: TickType,
    ) -> KernelResult<u32> {
        let satisfied = |bits: u32| {
            if wait_all {
                bits & flags == flags
            } else {
                bits & flags != 0
            }
        };

        let deadline = Deadline::after(timeout);
        let mut bits = super::enter(&self.bits);
        loop {
            let observed = *bits;
            if satisfied(observed) {
                if clear_on_exit {
                    *bits &= !flags;
                }
                return Ok(observed);
            }
            bits = match super::wait_until(&self.changed, bits, deadline) {
                Waited::Woken(bits) => bits,
                Waited::Expired(_) => return Err(status::unavailable(timeout)),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn set_and_clear_report_masks() {
        let group = RawEventGroup::new();
        assert_eq!(group.set(0b0101), 0b0101);
        assert_eq!(group.set(0b0010), 0b0111);
        assert_eq!(group.clear(0b0001), 0b0111);
        assert_eq!(group.get(), 0b0110);
    }

    #[test]
    fn wait_any_clears_only_awaited_bits() {
        let group = RawEventGroup::new();
        group.set(0b1011);
        assert_eq!(group.wait_bits(0b0011, true, false, 0), Ok(0b1011));
        assert_eq!(group.get(), 0b1000);
    }

    #[test]
    fn wait_all_times_out_or_polls() {
        let group = RawEventGroup::new();
        group.set(0b01);
        assert_eq!(
            group.wait_bits(0b11, false, true, 0),
            Err(Status::ErrorResource)
        );
        assert_eq!(
            group.wait_bits(0b11, false, true, 10),
            Err(Status::ErrorTimeout)
        );
    }

    #[test]
    fn waiter_is_released_by_set() {
        let group = Arc::new(RawEventGroup::new());
        let waiter = {
            let group = Arc::clone(&group);
            std::thread::spawn(move || group.wait_bits(0b110, true, true, 1_000))
        };
        std::thread::sleep(Duration::from_millis(5));
        group.set(0b010);
        group.set(0b101);
        assert_eq!(waiter.join().unwrap(), Ok(0b111));
        assert_eq!(group.get(), 0b001);
    }
}
