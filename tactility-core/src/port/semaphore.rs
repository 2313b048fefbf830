//! Counting and mutex semaphores.
//!
//! One primitive backs `Semaphore`, `Mutex` and `RecursiveMutex`, the same
//! way FreeRTOS builds all three on its queue object. Mutex kinds record their
//! owning task so that a release from the wrong task is reported instead of
//! corrupting the count.

use std::sync::{Condvar, Mutex};

use super::task::{self, TaskId};
use super::{Deadline, Waited};
use crate::kernel::TickType;
use crate::status::{self, Status};

#[derive(Debug)]
enum Kind {
    Counting {
        count: u32,
        max: u32,
    },
    Mutex {
        recursive: bool,
        owner: Option<TaskId>,
        depth: u32,
    },
}

impl Kind {
    /// Try to take one unit for `caller`; `true` on success.
    fn try_take(&mut self, caller: TaskId) -> bool {
        match self {
            Kind::Counting { count, .. } => {
                if *count > 0 {
                    *count -= 1;
                    true
                } else {
                    false
                }
            }
            Kind::Mutex {
                recursive,
                owner,
                depth,
            } => match *owner {
                None => {
                    *owner = Some(caller);
                    *depth = 1;
                    true
                }
                Some(current) if *recursive && current == caller => {
                    *depth += 1;
                    true
                }
                Some(_) => false,
            },
        }
    }

    /// Give one unit back on behalf of `caller`.
    ///
    /// Returns whether waiters should be woken.
    fn give(&mut self, caller: Option<TaskId>) -> Result<bool, Status> {
        match self {
            Kind::Counting { count, max } => {
                if *count >= *max {
                    return Err(Status::ErrorResource);
                }
                *count += 1;
                Ok(true)
            }
            Kind::Mutex { owner, depth, .. } => {
                if owner.is_none() || *owner != caller {
                    return Err(Status::ErrorResource);
                }
                *depth -= 1;
                if *depth == 0 {
                    *owner = None;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

/// A blocking semaphore of counting, mutex or recursive-mutex kind.
pub(crate) struct RawSemaphore {
    kind: Mutex<Kind>,
    available: Condvar,
}

impl RawSemaphore {
    /// Counting semaphore with `initial` of `max` units available.
    pub(crate) fn counting(max: u32, initial: u32) -> Self {
        debug_assert!(initial <= max);
        Self::with_kind(Kind::Counting {
            count: initial,
            max,
        })
    }

    /// Mutex semaphore, optionally re-entrant for its owner.
    pub(crate) fn mutex(recursive: bool) -> Self {
        Self::with_kind(Kind::Mutex {
            recursive,
            owner: None,
            depth: 0,
        })
    }

    fn with_kind(kind: Kind) -> Self {
        Self {
            kind: Mutex::new(kind),
            available: Condvar::new(),
        }
    }

    /// Take one unit, blocking for up to `timeout` ticks.
    pub(crate) fn take(&self, timeout: TickType) -> Status {
        let caller = task::current_id();
        let deadline = Deadline::after(timeout);
        let mut kind = super::enter(&self.kind);
        loop {
            if kind.try_take(caller) {
                return Status::Ok;
            }
            kind = match super::wait_until(&self.available, kind, deadline) {
                Waited::Woken(kind) => kind,
                Waited::Expired(_) => return status::unavailable(timeout),
            };
        }
    }

    /// Give one unit back from task context.
    ///
    /// A counting semaphore that is already full, or a mutex released by a
    /// task that does not hold it, reports [`Status::ErrorResource`].
    pub(crate) fn give(&self) -> Status {
        self.give_as(Some(task::current_id()))
    }

    fn give_as(&self, caller: Option<TaskId>) -> Status {
        let result = super::enter(&self.kind).give(caller);
        match result {
            Ok(wake) => {
                if wake {
                    self.available.notify_one();
                }
                Status::Ok
            }
            Err(status) => status,
        }
    }

    /// Non-blocking take from interrupt context.
    ///
    /// Only counting semaphores may be taken by an interrupt handler.
    pub(crate) fn take_from_isr(&self) -> Status {
        let mut kind = super::enter(&self.kind);
        match &mut *kind {
            Kind::Counting { count, .. } if *count > 0 => {
                *count -= 1;
                Status::Ok
            }
            Kind::Counting { .. } => Status::ErrorResource,
            Kind::Mutex { .. } => Status::ErrorIsr,
        }
    }

    /// Give from interrupt context.
    pub(crate) fn give_from_isr(&self) -> Status {
        if matches!(*super::enter(&self.kind), Kind::Mutex { .. }) {
            return Status::ErrorIsr;
        }
        self.give_as(None)
    }

    /// Units currently available (for a mutex: 1 when free, 0 when held).
    pub(crate) fn count(&self) -> u32 {
        match *super::enter(&self.kind) {
            Kind::Counting { count, .. } => count,
            Kind::Mutex { owner, .. } => u32::from(owner.is_none()),
        }
    }

    /// Task holding a mutex semaphore, if any.
    pub(crate) fn holder(&self) -> Option<TaskId> {
        match *super::enter(&self.kind) {
            Kind::Counting { .. } => None,
            Kind::Mutex { owner, .. } => owner,
        }
    }
}
