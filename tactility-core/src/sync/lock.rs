//! The [`Lock`] capability and its scoped helper.
//!
//! # Pattern Overview
//!
//! ```text
//! impl Lock (Mutex, RecursiveMutex, Semaphore)
//!       │
//!       │ lock.as_scoped_lock()
//!       ▼
//! ScopedLock<'_, L> (borrows the lock, does not acquire)
//!       │
//!       │ scoped.lock(timeout)
//!       ▼
//! held until the ScopedLock drops
//! ```
//!
//! # Example
//!
//! ```
//! use tactility_core::sync::{Lock, Mutex};
//!
//! let mutex = Mutex::new();
//! let value = mutex.with_lock(10, || 40 + 2);
//! assert_eq!(value, Some(42));
//!
//! {
//!     let scoped = mutex.as_scoped_lock();
//!     assert!(scoped.lock(10));
//!     // released when `scoped` drops
//! }
//! assert!(mutex.lock(0));
//! mutex.unlock();
//! ```

use core::cell::Cell;
use core::marker::PhantomData;

use crate::kernel::{TickType, MAX_TICKS};

/// Something that can be acquired with a timeout and released.
///
/// Releasing a lock the calling task does not hold is a contract violation
/// and panics for the mutex kinds.
pub trait Lock {
    /// Acquire the lock, blocking for up to `timeout` ticks.
    ///
    /// Returns `true` when the lock was acquired.
    fn lock(&self, timeout: TickType) -> bool;

    /// Release the lock.
    fn unlock(&self);

    /// Acquire the lock, waiting as long as it takes.
    fn lock_forever(&self) -> bool {
        self.lock(MAX_TICKS)
    }

    /// Run `on_acquired` while holding the lock.
    ///
    /// Returns `None` without calling `on_acquired` when the lock could not be
    /// acquired within `timeout`. The lock is released even if `on_acquired`
    /// panics.
    fn with_lock<R>(&self, timeout: TickType, on_acquired: impl FnOnce() -> R) -> Option<R>
    where
        Self: Sized,
    {
        let scoped = self.as_scoped_lock();
        if scoped.lock(timeout) {
            Some(on_acquired())
        } else {
            None
        }
    }

    /// Like [`with_lock`](Lock::with_lock), running `on_failure` when the lock
    /// could not be acquired.
    fn with_lock_or_else<R>(
        &self,
        timeout: TickType,
        on_acquired: impl FnOnce() -> R,
        on_failure: impl FnOnce() -> R,
    ) -> R
    where
        Self: Sized,
    {
        self.with_lock(timeout, on_acquired)
            .unwrap_or_else(on_failure)
    }

    /// Wrap this lock in a [`ScopedLock`]. The lock is not acquired.
    fn as_scoped_lock(&self) -> ScopedLock<'_, Self>
    where
        Self: Sized,
    {
        ScopedLock::new(self)
    }
}

/// Releases a borrowed [`Lock`] when dropped.
///
/// The wrapper never acquires on its own: call [`lock`](Lock::lock) on it.
/// On drop it releases every acquisition made through it that has not been
/// released yet, so a failed `lock` call is never answered with an unlock.
/// A lock taken directly on the inner lock, bypassing the wrapper, is not
/// released on drop.
///
/// A `ScopedLock` cannot outlive the lock it borrows:
///
/// ```compile_fail
/// use tactility_core::sync::{Lock, Mutex};
///
/// let scoped = {
///     let mutex = Mutex::new();
///     mutex.as_scoped_lock()
/// };
/// drop(scoped);
/// ```
///
/// and it stays on the task that created it:
///
/// ```compile_fail
/// use tactility_core::sync::{Lock, Mutex};
///
/// fn requires_send<T: Send>(_: T) {}
///
/// let mutex = Mutex::new();
/// requires_send(mutex.as_scoped_lock());
/// ```
#[must_use = "if unused, the ScopedLock releases nothing and guards nothing"]
pub struct ScopedLock<'a, L: ?Sized + Lock> {
    lock: &'a L,
    held: Cell<u32>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, L: ?Sized + Lock> ScopedLock<'a, L> {
    pub fn new(lock: &'a L) -> Self {
        Self {
            lock,
            held: Cell::new(0),
            _not_send: PhantomData,
        }
    }

    /// Number of acquisitions this wrapper will release on drop.
    pub fn held(&self) -> u32 {
        self.held.get()
    }
}

impl<L: ?Sized + Lock> Lock for ScopedLock<'_, L> {
    fn lock(&self, timeout: TickType) -> bool {
        let acquired = self.lock.lock(timeout);
        if acquired {
            self.held.set(self.held.get() + 1);
        }
        acquired
    }

    fn unlock(&self) {
        self.held.set(self.held.get().saturating_sub(1));
        self.lock.unlock();
    }
}

impl<L: ?Sized + Lock> Drop for ScopedLock<'_, L> {
    fn drop(&mut self) {
        for _ in 0..self.held.get() {
            self.lock.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records calls instead of locking anything.
    #[derive(Default)]
    struct Recorder {
        grant: Cell<bool>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl Lock for Recorder {
        fn lock(&self, _timeout: TickType) -> bool {
            self.calls.borrow_mut().push("lock");
            self.grant.get()
        }

        fn unlock(&self) {
            self.calls.borrow_mut().push("unlock");
        }
    }

    #[test]
    fn scoped_lock_ignores_direct_acquisitions() {
        let recorder = Recorder::default();
        recorder.grant.set(true);
        {
            let scoped = recorder.as_scoped_lock();
            assert!(recorder.lock(5));
            assert!(scoped.lock(5));
        }
        assert_eq!(*recorder.calls.borrow(), ["lock", "lock", "unlock"]);
    }

    #[test]
    fn with_lock_skips_callback_on_failure() {
        let recorder = Recorder::default();
        assert_eq!(recorder.with_lock(5, || 1), None);
        assert_eq!(*recorder.calls.borrow(), ["lock"]);
        assert_eq!(recorder.with_lock_or_else(5, || 1, || 2), 2);
    }

    #[test]
    fn with_lock_releases_after_callback() {
        let recorder = Recorder::default();
        recorder.grant.set(true);
        assert_eq!(recorder.with_lock(5, || 7), Some(7));
        assert_eq!(*recorder.calls.borrow(), ["lock", "unlock"]);
    }

    #[test]
    fn scoped_lock_releases_only_its_acquisitions() {
        let recorder = Recorder::default();
        {
            let scoped = recorder.as_scoped_lock();
            assert!(!scoped.lock(0));
            assert_eq!(scoped.held(), 0);
        }
        assert_eq!(*recorder.calls.borrow(), ["lock"]);

        recorder.grant.set(true);
        recorder.calls.borrow_mut().clear();
        {
            let scoped = recorder.as_scoped_lock();
            assert!(scoped.lock(0));
            assert!(scoped.lock_forever());
            scoped.unlock();
            assert_eq!(scoped.held(), 1);
        }
        assert_eq!(*recorder.calls.borrow(), ["lock", "lock", "unlock", "unlock"]);
    }

    #[test]
    fn scoped_lock_releases_on_panic() {
        let recorder = Recorder::default();
        recorder.grant.set(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            recorder.with_lock(0, || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(*recorder.calls.borrow(), ["lock", "unlock"]);
    }
}
