//! Task-owned mutexes.
//!
//! [`Mutex`] and [`RecursiveMutex`] wrap a port semaphore of mutex kind, so
//! each remembers which task holds it. Both are task-context only: locking or
//! unlocking from an interrupt handler is a contract violation and panics.
//!
//! # Pattern Overview
//!
//! ```text
//! Mutex / RecursiveMutex (owns the port semaphore)
//!       │
//!       │ mutex.lock_guard(timeout)
//!       ▼
//! MutexGuard<'_> (RAII guard, releases on drop, !Send)
//!
//! DataMutex<T> (Mutex + the T it protects)
//!       │
//!       │ data.lock(timeout) / data.lock_forever()
//!       ▼
//! DataGuard<'_, T> (Deref/DerefMut to T, !Send)
//! ```
//!
//! # Example
//!
//! ```
//! use tactility_core::sync::DataMutex;
//!
//! struct SharedState {
//!     counter: u32,
//! }
//!
//! let state = DataMutex::new(SharedState { counter: 0 });
//! {
//!     let mut guard = state.lock_forever();
//!     guard.counter += 1;
//! }
//! assert_eq!(state.lock(0).map(|guard| guard.counter), Some(1));
//! ```

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use super::Lock;
use crate::kernel::{self, TickType, MAX_TICKS};
use crate::port::semaphore::RawSemaphore;
use crate::port::task;

fn lock_raw(raw: &RawSemaphore, timeout: TickType) -> bool {
    assert!(!kernel::is_isr(), "mutex locked from interrupt context");
    raw.take(timeout).is_ok()
}

fn unlock_raw(raw: &RawSemaphore) {
    assert!(!kernel::is_isr(), "mutex unlocked from interrupt context");
    let status = raw.give();
    assert!(
        status.is_ok(),
        "mutex unlocked by a task that does not hold it ({status})"
    );
}

fn held_by_current(raw: &RawSemaphore) -> bool {
    raw.holder() == Some(task::current_id())
}

/// Non-recursive mutex.
///
/// Locking it again from the task that holds it blocks until the timeout
/// expires (forever with [`MAX_TICKS`]), like the underlying primitive.
pub struct Mutex {
    raw: RawSemaphore,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            raw: RawSemaphore::mutex(false),
        }
    }

    /// Acquire the mutex and return a guard that releases it on drop.
    pub fn lock_guard(&self, timeout: TickType) -> Option<MutexGuard<'_>> {
        MutexGuard::acquire(self, timeout)
    }

    /// Returns `true` if the calling task holds this mutex.
    pub fn is_held_by_current(&self) -> bool {
        held_by_current(&self.raw)
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for Mutex {
    fn lock(&self, timeout: TickType) -> bool {
        lock_raw(&self.raw, timeout)
    }

    /// # Panics
    ///
    /// If the calling task does not hold the mutex.
    fn unlock(&self) {
        unlock_raw(&self.raw);
    }
}

/// Mutex that the holding task may lock again.
///
/// It is released to other tasks once every `lock` has been matched by an
/// `unlock`.
pub struct RecursiveMutex {
    raw: RawSemaphore,
}

impl RecursiveMutex {
    pub fn new() -> Self {
        Self {
            raw: RawSemaphore::mutex(true),
        }
    }

    pub fn lock_guard(&self, timeout: TickType) -> Option<MutexGuard<'_>> {
        MutexGuard::acquire(self, timeout)
    }

    pub fn is_held_by_current(&self) -> bool {
        held_by_current(&self.raw)
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for RecursiveMutex {
    fn lock(&self, timeout: TickType) -> bool {
        lock_raw(&self.raw, timeout)
    }

    fn unlock(&self) {
        unlock_raw(&self.raw);
    }
}

/// RAII guard for a locked [`Mutex`] or [`RecursiveMutex`].
///
/// This type is `!Send`: mutex ownership belongs to the task that locked it.
///
/// ```compile_fail
/// use tactility_core::sync::Mutex;
///
/// fn requires_send<T: Send>(_: T) {}
///
/// let mutex = Mutex::new();
/// let guard = mutex.lock_guard(0).unwrap();
/// requires_send(guard);
/// ```
#[must_use = "if unused, the mutex will immediately unlock"]
pub struct MutexGuard<'a> {
    lock: &'a dyn Lock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> MutexGuard<'a> {
    fn acquire(lock: &'a dyn Lock, timeout: TickType) -> Option<Self> {
        lock.lock(timeout).then_some(Self {
            lock,
            _not_send: PhantomData,
        })
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// A mutex that owns the data it protects.
pub struct DataMutex<T> {
    mutex: Mutex,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` only happens through a `DataGuard`, which holds
// the mutex.
unsafe impl<T: Send> Sync for DataMutex<T> {}

impl<T> DataMutex<T> {
    pub fn new(data: T) -> Self {
        Self {
            mutex: Mutex::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the mutex, waiting up to `timeout` ticks.
    pub fn lock(&self, timeout: TickType) -> Option<DataGuard<'_, T>> {
        let guard = self.mutex.lock_guard(timeout)?;
        Some(DataGuard {
            _guard: guard,
            data: &self.data,
        })
    }

    /// Acquire the mutex, waiting as long as it takes.
    pub fn lock_forever(&self) -> DataGuard<'_, T> {
        loop {
            if let Some(guard) = self.lock(MAX_TICKS) {
                return guard;
            }
        }
    }

    /// Returns `true` if the calling task holds the mutex.
    pub fn is_held_by_current(&self) -> bool {
        self.mutex.is_held_by_current()
    }

    /// Access the data through an exclusive borrow, without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for DataMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Access to the data of a locked [`DataMutex`].
///
/// This type is `!Send` because it contains a [`MutexGuard`].
///
/// ```compile_fail
/// use tactility_core::sync::DataMutex;
///
/// fn requires_send<T: Send>(_: T) {}
///
/// let data = DataMutex::new(0u32);
/// requires_send(data.lock_forever());
/// ```
pub struct DataGuard<'a, T> {
    _guard: MutexGuard<'a>,
    data: &'a UnsafeCell<T>,
}

impl<T> Deref for DataGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: `_guard` holds the mutex.
        unsafe { &*self.data.get() }
    }
}

impl<T> DerefMut for DataGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: `_guard` holds the mutex exclusively.
        unsafe { &mut *self.data.get() }
    }
}
