//! 32-bit event flags.
//!
//! `set`, `clear` and `get` exist in a task and an interrupt variant; `wait`
//! is task-only because it blocks.
//!
//! # Example
//!
//! ```
//! use tactility_core::sync::EventGroup;
//!
//! const CONNECTED: u32 = 1 << 0;
//! const FAILED: u32 = 1 << 1;
//!
//! let events = EventGroup::new();
//! events.set(CONNECTED);
//! let flags = events.wait(CONNECTED | FAILED, false, true, 100).unwrap();
//! assert_eq!(flags & CONNECTED, CONNECTED);
//! assert_eq!(events.get(), 0);
//! ```

use core::fmt;

use crate::kernel::{self, TickType};
use crate::port::event_group::RawEventGroup;
use crate::status::Status;

/// Why [`EventGroup::wait`] returned without its condition holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventGroupError {
    /// The timeout (non-zero) elapsed.
    Timeout,
    /// A zero-timeout poll found the condition unmet.
    Resource,
    /// No flags were requested.
    Parameter,
}

impl fmt::Display for EventGroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventGroupError::Timeout => f.write_str("timed out waiting for event flags"),
            EventGroupError::Resource => f.write_str("event flags not set"),
            EventGroupError::Parameter => f.write_str("no event flags requested"),
        }
    }
}

impl std::error::Error for EventGroupError {}

pub struct EventGroup {
    raw: RawEventGroup,
}

impl EventGroup {
    /// # Panics
    ///
    /// When called from interrupt context.
    pub fn new() -> Self {
        assert!(!kernel::is_isr(), "event group created in interrupt context");
        Self {
            raw: RawEventGroup::new(),
        }
    }

    /// Set `flags`, returning the flags after setting.
    pub fn set(&self, flags: u32) -> u32 {
        assert!(!kernel::is_isr(), "EventGroup::set called from interrupt context");
        self.raw.set(flags)
    }

    /// Clear `flags`, returning the flags as they were before clearing.
    pub fn clear(&self, flags: u32) -> u32 {
        assert!(!kernel::is_isr(), "EventGroup::clear called from interrupt context");
        self.raw.clear(flags)
    }

    pub fn get(&self) -> u32 {
        assert!(!kernel::is_isr(), "EventGroup::get called from interrupt context");
        self.raw.get()
    }

    pub fn set_from_isr(&self, flags: u32) -> u32 {
        assert!(kernel::is_isr(), "EventGroup::set_from_isr called from task context");
        self.raw.set(flags)
    }

    pub fn clear_from_isr(&self, flags: u32) -> u32 {
        assert!(kernel::is_isr(), "EventGroup::clear_from_isr called from task context");
        self.raw.clear(flags)
    }

    pub fn get_from_isr(&self) -> u32 {
        assert!(kernel::is_isr(), "EventGroup::get_from_isr called from task context");
        self.raw.get()
    }

    /// Wait until any (or, with `await_all`, all) of `flags` are set.
    ///
    /// Returns the flags observed when the condition was met. With
    /// `clear_on_exit` the awaited `flags` are cleared before returning;
    /// other bits are left untouched.
    ///
    /// # Panics
    ///
    /// When called from interrupt context.
    pub fn wait(
        &self,
        flags: u32,
        await_all: bool,
        clear_on_exit: bool,
        timeout: TickType,
    ) -> Result<u32, EventGroupError> {
        assert!(!kernel::is_isr(), "EventGroup::wait called from interrupt context");
        if flags == 0 {
            return Err(EventGroupError::Parameter);
        }
        self.raw
            .wait_bits(flags, clear_on_exit, await_all, timeout)
            .map_err(|status| match status {
                Status::ErrorResource => EventGroupError::Resource,
                Status::ErrorParameter => EventGroupError::Parameter,
                _ => EventGroupError::Timeout,
            })
    }
}

impl Default for EventGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventGroup {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(!kernel::is_isr(), "event group dropped in interrupt context");
        }
    }
}
