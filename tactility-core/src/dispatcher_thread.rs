//! A [`Dispatcher`] paired with the [`Thread`] that consumes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DISPATCHER_THREAD_POLL_TICKS;
use crate::dispatcher::Dispatcher;
use crate::kernel::{TickType, MAX_TICKS};
use crate::thread::{State, Thread};

/// Runs dispatched functions on a dedicated thread.
///
/// ```
/// use std::sync::Arc;
/// use tactility_core::dispatcher_thread::DispatcherThread;
/// use tactility_core::kernel::MAX_TICKS;
/// use tactility_core::sync::Semaphore;
///
/// let worker = DispatcherThread::new("worker", 4096);
/// worker.start();
///
/// let done = Arc::new(Semaphore::new(1, 0));
/// let signal = Arc::clone(&done);
/// assert!(worker.dispatch(move || { signal.release(); }, MAX_TICKS));
/// assert!(done.acquire(MAX_TICKS));
///
/// worker.stop();
/// ```
pub struct DispatcherThread {
    dispatcher: Arc<Dispatcher>,
    interrupted: Arc<AtomicBool>,
    thread: Thread,
}

impl DispatcherThread {
    /// Create a stopped dispatcher thread.
    pub fn new(name: impl Into<String>, stack_size: usize) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let interrupted = Arc::new(AtomicBool::new(false));

        let thread = {
            let dispatcher = Arc::clone(&dispatcher);
            let interrupted = Arc::clone(&interrupted);
            Thread::new(name, stack_size, move || {
                while !interrupted.load(Ordering::Acquire) {
                    dispatcher.consume(DISPATCHER_THREAD_POLL_TICKS);
                }
                0
            })
        };

        Self {
            dispatcher,
            interrupted,
            thread,
        }
    }

    /// Queue `function` to run on this thread.
    ///
    /// Functions dispatched before [`start`](Self::start) run once the thread
    /// starts.
    pub fn dispatch(&self, function: impl FnOnce() + Send + 'static, timeout: TickType) -> bool {
        self.dispatcher.dispatch(function, timeout)
    }

    /// Start consuming on the thread.
    ///
    /// # Panics
    ///
    /// When the thread is already running.
    pub fn start(&self) {
        self.interrupted.store(false, Ordering::Release);
        self.thread.start();
    }

    /// Stop consuming and wait for the thread to exit.
    ///
    /// Work still queued after the current drain is left in the queue.
    pub fn stop(&self) {
        self.interrupted.store(true, Ordering::Release);
        // Wake the consumer instead of waiting for its poll timeout.
        self.dispatcher.dispatch(|| {}, MAX_TICKS);
        self.thread.join(MAX_TICKS);
    }

    pub fn is_running(&self) -> bool {
        self.thread.get_state() != State::Stopped
    }

    /// The thread's underlying dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl Drop for DispatcherThread {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
