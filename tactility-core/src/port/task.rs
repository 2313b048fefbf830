//! Task identity and creation.
//!
//! Every OS thread that touches the port gets a [`TaskId`], including threads
//! that were not created through [`spawn`] (the test harness, `main`). Ids
//! are never reused, so a stale id can never alias a live task.

use std::any::Any;
use std::cell::Cell;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::config::{HOST_MIN_STACK_SIZE, MAX_STACK_DEPTH, STACK_WORD_SIZE};
use crate::status::{KernelResult, Status};

/// Opaque identifier of a task (the native "task handle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// Numeric value of the id, for logging.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_TASK: Cell<Option<TaskId>> = const { Cell::new(None) };
}

fn allocate_id() -> TaskId {
    let raw = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    // The counter starts at 1 and a u64 does not wrap in practice.
    TaskId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
}

/// Id of the calling task, assigned on first use.
pub(crate) fn current_id() -> TaskId {
    CURRENT_TASK.with(|current| match current.get() {
        Some(id) => id,
        None => {
            let id = allocate_id();
            current.set(Some(id));
            id
        }
    })
}

/// Creation parameters for a native task.
pub(crate) struct TaskParams {
    pub name: String,
    pub stack_size: usize,
    pub priority: u8,
    pub affinity: Option<u8>,
}

/// A running (or finished but not yet reaped) native task.
pub(crate) struct NativeTask {
    id: TaskId,
    handle: JoinHandle<()>,
}

impl NativeTask {
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Wait for the OS thread to exit.
    ///
    /// Only call this once the task's entry function has returned (or is about
    /// to), otherwise it blocks for the task's whole lifetime.
    pub(crate) fn reap(self) {
        if let Err(payload) = self.handle.join() {
            log::error!(
                "task {} terminated by panic: {}",
                self.id.get(),
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Create a task running `entry`.
///
/// Fails with [`Status::ErrorParameter`] for a stack size outside
/// `(0, MAX_STACK_DEPTH * STACK_WORD_SIZE)` and with
/// [`Status::ErrorNoMemory`] when the OS refuses to create the thread.
pub(crate) fn spawn(
    params: TaskParams,
    entry: impl FnOnce() + Send + 'static,
) -> KernelResult<NativeTask> {
    if params.stack_size == 0 || params.stack_size >= MAX_STACK_DEPTH * STACK_WORD_SIZE {
        return Err(Status::ErrorParameter);
    }

    if let Some(core) = params.affinity {
        log::debug!(
            "task {}: affinity to core {} is not supported by the host port",
            params.name,
            core
        );
    }
    log::debug!(
        "task {}: priority {} recorded, stack {} bytes",
        params.name,
        params.priority,
        params.stack_size
    );

    let id = allocate_id();
    let handle = std::thread::Builder::new()
        .name(params.name)
        .stack_size(params.stack_size.max(HOST_MIN_STACK_SIZE))
        .spawn(move || {
            CURRENT_TASK.with(|current| current.set(Some(id)));
            entry();
        })
        .map_err(|_| Status::ErrorNoMemory)?;

    Ok(NativeTask { id, handle })
}

/// Stack high-water mark of `task` in bytes.
///
/// OS threads do not expose one, so the host port reports 0.
pub(crate) fn free_stack_bytes(_task: TaskId) -> usize {
    0
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Yield the processor to other tasks.
#[inline]
pub(crate) fn yield_now() {
    std::thread::yield_now();
}
