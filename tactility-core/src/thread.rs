//! Task lifecycle wrapper.
//!
//! A [`Thread`] is configured while stopped, started with [`Thread::start`],
//! and runs its main function once per start on a fresh task:
//!
//! ```text
//! Stopped ──start()──▶ Starting ──(task entry)──▶ Running ──(main returns)──▶ Stopped
//! ```
//!
//! The main function's return code is available through
//! [`Thread::get_return_code`] once the thread has stopped. A main function
//! that panics stops the thread with [`PANIC_RETURN_CODE`]. Inside the task,
//! [`Thread::current`] returns a reference to the owning thread.
//!
//! # Example
//!
//! ```
//! use tactility_core::kernel::MAX_TICKS;
//! use tactility_core::thread::{State, Thread};
//!
//! let thread = Thread::new("worker", 4096, || 42);
//! thread.start();
//! assert!(thread.join(MAX_TICKS));
//! assert_eq!(thread.get_state(), State::Stopped);
//! assert_eq!(thread.get_return_code(), 42);
//! ```

use core::cell::RefCell;
use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::{DEFAULT_STACK_SIZE, MAX_STACK_DEPTH, STACK_WORD_SIZE};
use crate::kernel::{self, TickType};
use crate::port::task::{self, NativeTask, TaskId, TaskParams};
use crate::sync::{DataGuard, DataMutex, EventGroup};

/// Lifecycle state of a [`Thread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Starting,
    Running,
}

/// Scheduling priority; higher values preempt lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Priority {
    None = 0,
    Idle = 1,
    Lower = 2,
    Low = 3,
    #[default]
    Normal = 4,
    High = 5,
    Higher = 6,
    Critical = 7,
}

impl Priority {
    pub const fn value(self) -> u8 {
        self as u8
    }
}

pub const THREAD_PRIORITY_SERVICE: Priority = Priority::High;
pub const THREAD_PRIORITY_RENDER: Priority = Priority::Higher;
pub const THREAD_PRIORITY_ISR: Priority = Priority::Critical;

/// Return code recorded when the main function panics.
pub const PANIC_RETURN_CODE: i32 = -1;

/// Body of a thread, returning its result code.
pub type MainFunction = Box<dyn FnMut() -> i32 + Send>;

/// Observer of state changes, called while the thread's state lock is held.
pub type StateCallback = Box<dyn Fn(State) + Send>;

const EXITED: u32 = 1 << 0;

struct Inner {
    name: String,
    stack_size: usize,
    priority: Priority,
    affinity: Option<u8>,
    main: Option<MainFunction>,
    state: State,
    task: Option<TaskId>,
    native: Option<NativeTask>,
    return_code: i32,
    state_callback: Option<StateCallback>,
}

impl Inner {
    fn set_state(&mut self, state: State) {
        self.state = state;
        if let Some(callback) = &self.state_callback {
            callback(state);
        }
    }
}

struct Shared {
    inner: DataMutex<Inner>,
    exited: EventGroup,
}

impl Shared {
    fn inner(&self) -> DataGuard<'_, Inner> {
        self.inner.lock_forever()
    }

    /// Entry point of the native task.
    fn run(self: Arc<Self>, mut main: MainFunction) {
        CURRENT.with(|current| *current.borrow_mut() = Some(Arc::clone(&self)));

        let name = {
            let mut inner = self.inner();
            assert_eq!(inner.state, State::Starting);
            inner.set_state(State::Running);
            inner.name.clone()
        };
        log::info!("Starting {name}");

        let code = match panic::catch_unwind(AssertUnwindSafe(|| main())) {
            Ok(code) => code,
            Err(payload) => {
                log::error!("{name} panicked: {}", task::panic_message(payload.as_ref()));
                PANIC_RETURN_CODE
            }
        };

        {
            let mut inner = self.inner();
            assert_eq!(inner.state, State::Running);
            inner.return_code = code;
            inner.main = Some(main);
            inner.set_state(State::Stopped);
            inner.task = None;
        }
        log::info!("Stopped {name}");

        CURRENT.with(|current| current.borrow_mut().take());
        self.exited.set(EXITED);
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Shared>>> = const { RefCell::new(None) };
}

/// A schedulable unit of execution with its own stack.
pub struct Thread {
    shared: Arc<Shared>,
}

impl Thread {
    /// Create a stopped thread.
    ///
    /// `stack_size` is in bytes and must be a multiple of the stack word size.
    pub fn new(
        name: impl Into<String>,
        stack_size: usize,
        main: impl FnMut() -> i32 + Send + 'static,
    ) -> Self {
        let thread = Self::default();
        thread.set_name(name);
        thread.set_stack_size(stack_size);
        thread.set_main_function(main);
        thread
    }

    /// Create a stopped thread pinned to core `affinity` (`None` floats).
    pub fn with_affinity(
        name: impl Into<String>,
        stack_size: usize,
        main: impl FnMut() -> i32 + Send + 'static,
        affinity: Option<u8>,
    ) -> Self {
        let thread = Self::new(name, stack_size, main);
        thread.set_affinity(affinity);
        thread
    }

    fn stopped_inner(&self, setter: &str) -> DataGuard<'_, Inner> {
        let inner = self.shared.inner();
        assert_eq!(
            inner.state,
            State::Stopped,
            "Thread::{setter} called while the thread is not stopped"
        );
        inner
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.stopped_inner("set_name").name = name.into();
    }

    /// # Panics
    ///
    /// When the thread is not stopped or `stack_size` is not a multiple of the
    /// stack word size.
    pub fn set_stack_size(&self, stack_size: usize) {
        let mut inner = self.stopped_inner("set_stack_size");
        assert!(
            stack_size % STACK_WORD_SIZE == 0,
            "stack size {stack_size} is not a multiple of {STACK_WORD_SIZE}"
        );
        inner.stack_size = stack_size;
    }

    /// Pin the thread to a core, or let it float with `None`.
    pub fn set_affinity(&self, affinity: Option<u8>) {
        self.stopped_inner("set_affinity").affinity = affinity;
    }

    pub fn set_main_function(&self, main: impl FnMut() -> i32 + Send + 'static) {
        self.stopped_inner("set_main_function").main = Some(Box::new(main));
    }

    pub fn set_priority(&self, priority: Priority) {
        self.stopped_inner("set_priority").priority = priority;
    }

    pub fn set_state_callback(&self, callback: impl Fn(State) + Send + 'static) {
        self.stopped_inner("set_state_callback").state_callback = Some(Box::new(callback));
    }

    pub fn get_state(&self) -> State {
        self.shared.inner().state
    }

    pub fn get_name(&self) -> String {
        self.shared.inner().name.clone()
    }

    pub fn get_priority(&self) -> Priority {
        self.shared.inner().priority
    }

    /// Native task of the running thread; `None` while stopped.
    pub fn get_task_handle(&self) -> Option<TaskId> {
        self.shared.inner().task
    }

    pub fn get_affinity(&self) -> Option<u8> {
        self.shared.inner().affinity
    }

    /// Unused stack of the running task in bytes.
    ///
    /// Returns 0 in interrupt context, while stopped, and on the host port,
    /// which has no stack high-water mark.
    pub fn get_stack_space(&self) -> usize {
        if kernel::is_isr() {
            return 0;
        }
        match self.shared.inner().task {
            Some(task) => task::free_stack_bytes(task),
            None => 0,
        }
    }

    /// Start the thread on a new task.
    ///
    /// # Panics
    ///
    /// When no main function is set, the thread is not stopped, the stack
    /// size is outside `(0, 65535 * STACK_WORD_SIZE)`, or the task cannot be
    /// created.
    pub fn start(&self) {
        let mut inner = self.shared.inner();
        assert_eq!(inner.state, State::Stopped, "Thread::start on a thread that is not stopped");
        assert!(
            inner.stack_size > 0 && inner.stack_size < MAX_STACK_DEPTH * STACK_WORD_SIZE,
            "invalid stack size {}",
            inner.stack_size
        );
        let Some(main) = inner.main.take() else {
            panic!("Thread::start without a main function");
        };

        // A previous run has stopped; its task only has to return.
        if let Some(previous) = inner.native.take() {
            previous.reap();
        }

        inner.set_state(State::Starting);
        self.shared.exited.clear(EXITED);

        let params = TaskParams {
            name: inner.name.clone(),
            stack_size: inner.stack_size,
            priority: inner.priority.value(),
            affinity: inner.affinity,
        };
        let shared = Arc::clone(&self.shared);
        // The entry function waits for `inner` to be released, so the handle is
        // stored before the task observes any state.
        match task::spawn(params, move || shared.run(main)) {
            Ok(native) => {
                inner.task = Some(native.id());
                inner.native = Some(native);
            }
            Err(status) => panic!("failed to create task {}: {status}", inner.name),
        }
    }

    /// Wait for the thread to stop.
    ///
    /// Returns `true` once the thread is stopped (immediately if it was never
    /// started) and `false` when `timeout` elapses first.
    ///
    /// # Panics
    ///
    /// When called from the thread itself or from interrupt context.
    pub fn join(&self, timeout: TickType) -> bool {
        assert!(!self.is_current(), "a thread cannot join itself");
        assert!(!kernel::is_isr(), "Thread::join called from interrupt context");

        let running = self.shared.inner().task.is_some();
        if running && self.shared.exited.wait(EXITED, false, false, timeout).is_err() {
            return false;
        }

        let native = self.shared.inner().native.take();
        if let Some(native) = native {
            native.reap();
        }
        true
    }

    /// Result code of the last run.
    ///
    /// # Panics
    ///
    /// When the thread is not stopped.
    pub fn get_return_code(&self) -> i32 {
        let inner = self.shared.inner();
        assert_eq!(inner.state, State::Stopped, "return code read while the thread runs");
        inner.return_code
    }

    /// Returns `true` when called from this thread's own task.
    pub fn is_current(&self) -> bool {
        Thread::current().is_some_and(|current| current.is(self))
    }

    /// The thread whose task is calling, or `None` for tasks not started
    /// through [`Thread`].
    pub fn current() -> Option<ThreadRef> {
        CURRENT.with(|current| current.borrow().clone().map(|shared| ThreadRef { shared }))
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: DataMutex::new(Inner {
                    name: String::new(),
                    stack_size: DEFAULT_STACK_SIZE,
                    priority: Priority::default(),
                    affinity: None,
                    main: None,
                    state: State::Stopped,
                    task: None,
                    native: None,
                    return_code: 0,
                    state_callback: None,
                }),
                exited: EventGroup::new(),
            }),
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner();
        f.debug_struct("Thread")
            .field("name", &inner.name)
            .field("state", &inner.state)
            .field("priority", &inner.priority)
            .finish()
    }
}

impl Drop for Thread {
    /// # Panics
    ///
    /// When the thread is still running; call [`Thread::join`] first.
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let native = {
            let mut inner = self.shared.inner();
            assert_eq!(inner.state, State::Stopped, "thread {} dropped while running", inner.name);
            inner.native.take()
        };
        if let Some(native) = native {
            native.reap();
        }
    }
}

/// Borrowed view of the [`Thread`] running the current task.
#[derive(Clone)]
pub struct ThreadRef {
    shared: Arc<Shared>,
}

impl ThreadRef {
    pub fn name(&self) -> String {
        self.shared.inner().name.clone()
    }

    pub fn state(&self) -> State {
        self.shared.inner().state
    }

    pub fn priority(&self) -> Priority {
        self.shared.inner().priority
    }

    /// Returns `true` if this refers to `thread`.
    pub fn is(&self, thread: &Thread) -> bool {
        Arc::ptr_eq(&self.shared, &thread.shared)
    }
}
