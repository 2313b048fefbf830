//! Timer service task ("timer daemon").
//!
//! All software timers share one daemon task. It runs deferred function
//! calls first, then the callback of every timer whose expiry has passed, in
//! expiry order. Callbacks never run concurrently with each other. A callback
//! or deferred call that panics is logged and the daemon keeps running.
//!
//! Deferred calls ([`PendingCall`]) are stored by value in a fixed-capacity
//! queue so that an interrupt handler can post one without allocating.

use core::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, Once, OnceLock};
use std::time::Instant;

use heapless::Deque;

use super::task::{self, TaskId, TaskParams};
use super::{Deadline, Waited};
use crate::config::{TIMER_QUEUE_LENGTH, TIMER_SERVICE_NAME, TIMER_SERVICE_STACK_SIZE};
use crate::kernel::{self, TickType};
use crate::status::{self, Status};

/// Callback of a software timer.
pub(crate) type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Identifier of a timer registered with the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TimerId(u64);

/// A function call deferred to the timer service.
///
/// Holds a plain function pointer and a `'static` context, so it can be
/// queued from interrupt context without allocation.
pub(crate) struct PendingCall {
    trampoline: unsafe fn(*const (), *const (), u32),
    function: *const (),
    context: *const (),
    arg: u32,
}

// SAFETY: `function` is a plain fn pointer and `context` points to a `Sync`
// value with `'static` lifetime (enforced by `PendingCall::new`).
unsafe impl Send for PendingCall {}

impl PendingCall {
    pub(crate) fn new<C: Sync + 'static>(
        function: fn(&'static C, u32),
        context: &'static C,
        arg: u32,
    ) -> Self {
        unsafe fn trampoline<C: Sync + 'static>(
            function: *const (),
            context: *const (),
            arg: u32,
        ) {
            // SAFETY: both pointers were produced from these exact types in
            // `PendingCall::new::<C>`.
            let function: fn(&'static C, u32) = unsafe { core::mem::transmute(function) };
            let context: &'static C = unsafe { &*context.cast::<C>() };
            function(context, arg);
        }

        Self {
            trampoline: trampoline::<C>,
            function: function as *const (),
            context: (context as *const C).cast(),
            arg,
        }
    }

    fn invoke(self) {
        // SAFETY: `trampoline` was instantiated for the types behind
        // `function` and `context`.
        unsafe { (self.trampoline)(self.function, self.context, self.arg) }
    }
}

struct TimerEntry {
    period: TickType,
    auto_reload: bool,
    expiry: Option<Instant>,
    callback: TimerCallback,
}

#[derive(Default)]
struct State {
    timers: BTreeMap<TimerId, TimerEntry>,
    next_id: u64,
    in_flight: Option<TimerId>,
    daemon: Option<TaskId>,
    priority: u8,
}

impl State {
    fn next_expired(&self, now: Instant) -> Result<TimerId, Option<Instant>> {
        let earliest = self
            .timers
            .iter()
            .filter_map(|(id, timer)| timer.expiry.map(|at| (at, *id)))
            .min();
        match earliest {
            Some((at, id)) if at <= now => Ok(id),
            Some((at, _)) => Err(Some(at)),
            None => Err(None),
        }
    }
}

type PendingQueue = critical_section::Mutex<RefCell<Deque<PendingCall, TIMER_QUEUE_LENGTH>>>;

pub(crate) struct TimerService {
    state: Mutex<State>,
    changed: Condvar,
    pending: PendingQueue,
}

static SERVICE: OnceLock<TimerService> = OnceLock::new();
static DAEMON: Once = Once::new();

/// The process-wide timer service, started on first use.
pub(crate) fn service() -> &'static TimerService {
    let service = SERVICE.get_or_init(TimerService::new);
    DAEMON.call_once(|| {
        let params = TaskParams {
            name: TIMER_SERVICE_NAME.into(),
            stack_size: TIMER_SERVICE_STACK_SIZE,
            priority: service.priority(),
            affinity: None,
        };
        match task::spawn(params, move || service.run()) {
            Ok(daemon) => log::debug!("timer service started as task {}", daemon.id().get()),
            Err(status) => panic!("failed to start timer service: {status}"),
        }
    });
    service
}

impl TimerService {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
            changed: Condvar::new(),
            pending: critical_section::Mutex::new(RefCell::new(Deque::new())),
        }
    }

    fn priority(&self) -> u8 {
        super::enter(&self.state).priority
    }

    /// Register a dormant timer.
    pub(crate) fn create(
        &self,
        period: TickType,
        auto_reload: bool,
        callback: TimerCallback,
    ) -> TimerId {
        let mut state = super::enter(&self.state);
        let id = TimerId(state.next_id);
        state.next_id += 1;
        state.timers.insert(
            id,
            TimerEntry {
                period,
                auto_reload,
                expiry: None,
                callback,
            },
        );
        id
    }

    fn update(&self, id: TimerId, apply: impl FnOnce(&mut TimerEntry)) -> Status {
        let mut state = super::enter(&self.state);
        let Some(timer) = state.timers.get_mut(&id) else {
            return Status::ErrorParameter;
        };
        apply(timer);
        drop(state);
        self.changed.notify_all();
        Status::Ok
    }

    /// Arm the timer to expire one period from now.
    pub(crate) fn start(&self, id: TimerId) -> Status {
        self.update(id, |timer| {
            timer.expiry = Some(Instant::now() + kernel::ticks_to_duration(timer.period));
        })
    }

    /// Disarm the timer. Stopping a dormant timer is not an error.
    pub(crate) fn stop(&self, id: TimerId) -> Status {
        self.update(id, |timer| timer.expiry = None)
    }

    /// Set a new period and (re)arm the timer with it.
    pub(crate) fn change_period(&self, id: TimerId, period: TickType) -> Status {
        if period == 0 {
            return Status::ErrorParameter;
        }
        self.update(id, |timer| {
            timer.period = period;
            timer.expiry = Some(Instant::now() + kernel::ticks_to_duration(period));
        })
    }

    pub(crate) fn is_active(&self, id: TimerId) -> bool {
        super::enter(&self.state)
            .timers
            .get(&id)
            .is_some_and(|timer| timer.expiry.is_some())
    }

    /// Tick count at which the timer next expires, if armed.
    pub(crate) fn expiry_ticks(&self, id: TimerId) -> Option<TickType> {
        super::enter(&self.state)
            .timers
            .get(&id)
            .and_then(|timer| timer.expiry)
            .map(kernel::ticks_at)
    }

    /// Remove the timer, waiting for its callback if it is running.
    ///
    /// A timer deleted from inside a callback (i.e. on the daemon itself) is
    /// removed without waiting.
    pub(crate) fn delete(&self, id: TimerId) {
        let mut state = super::enter(&self.state);
        state.timers.remove(&id);
        if state.daemon == Some(task::current_id()) {
            return;
        }
        while state.in_flight == Some(id) {
            state = match super::wait_until(&self.changed, state, Deadline::Never) {
                Waited::Woken(state) | Waited::Expired(state) => state,
            };
        }
    }

    /// Record the scheduling priority of the daemon task.
    pub(crate) fn set_priority(&self, priority: u8) {
        super::enter(&self.state).priority = priority;
        log::debug!("timer service priority set to {priority}");
    }

    fn try_push(&self, call: PendingCall) -> Result<(), PendingCall> {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).push_back(call))
    }

    fn pop_pending(&self) -> Option<PendingCall> {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).pop_front())
    }

    /// Queue `call` from task context, waiting up to `timeout` for room.
    pub(crate) fn pend_call(&self, call: PendingCall, timeout: TickType) -> Status {
        let deadline = Deadline::after(timeout);
        let mut call = call;
        let mut state = super::enter(&self.state);
        loop {
            match self.try_push(call) {
                Ok(()) => {
                    drop(state);
                    self.changed.notify_all();
                    return Status::Ok;
                }
                Err(rejected) => call = rejected,
            }
            state = match super::wait_until(&self.changed, state, deadline) {
                Waited::Woken(state) => state,
                Waited::Expired(_) => return status::unavailable(timeout),
            };
        }
    }

    /// Queue `call` from interrupt context; fails at once when the queue is full.
    pub(crate) fn pend_call_from_isr(&self, call: PendingCall) -> Status {
        if self.try_push(call).is_err() {
            return Status::ErrorNoMemory;
        }
        // Serialize with the daemon's "queue empty" check before waking it.
        drop(super::enter(&self.state));
        self.changed.notify_all();
        Status::Ok
    }

    fn run(&self) {
        let mut state = super::enter(&self.state);
        state.daemon = Some(task::current_id());
        loop {
            if let Some(call) = self.pop_pending() {
                drop(state);
                self.changed.notify_all();
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call.invoke())) {
                    log::error!(
                        "pending call panicked: {}",
                        task::panic_message(payload.as_ref())
                    );
                }
                state = super::enter(&self.state);
                continue;
            }

            let now = Instant::now();
            match state.next_expired(now) {
                Ok(id) => {
                    let Some(timer) = state.timers.get_mut(&id) else {
                        continue;
                    };
                    let callback = Arc::clone(&timer.callback);
                    timer.expiry = match (timer.auto_reload, timer.expiry) {
                        (true, Some(at)) => Some(at + kernel::ticks_to_duration(timer.period)),
                        _ => None,
                    };
                    state.in_flight = Some(id);
                    drop(state);

                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
                        log::error!(
                            "timer callback panicked: {}",
                            task::panic_message(payload.as_ref())
                        );
                    }

                    state = super::enter(&self.state);
                    state.in_flight = None;
                    self.changed.notify_all();
                }
                Err(next) => {
                    let deadline = match next {
                        Some(at) => Deadline::At(at),
                        None => Deadline::Never,
                    };
                    state = match super::wait_until(&self.changed, state, deadline) {
                        Waited::Woken(state) | Waited::Expired(state) => state,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn once_timer_fires_once_and_disarms() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let service = service();
        let id = service.create(
            5,
            false,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(!service.is_active(id));
        assert_eq!(service.start(id), Status::Ok);
        assert!(service.expiry_ticks(id).is_some());
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!service.is_active(id));
        service.delete(id);
        assert_eq!(service.start(id), Status::ErrorParameter);
    }

    #[test]
    fn panicking_callback_leaves_service_running() {
        let service = service();
        let bad = service.create(1, false, Arc::new(|| panic!("callback failed")));
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let good = service.create(
            2,
            false,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(service.start(bad), Status::Ok);
        assert_eq!(service.start(good), Status::Ok);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        service.delete(bad);
        service.delete(good);
    }

    #[test]
    fn pending_call_runs_on_daemon() {
        static SENDER: OnceLock<Mutex<mpsc::Sender<(String, u32)>>> = OnceLock::new();
        fn report(sender: &'static OnceLock<Mutex<mpsc::Sender<(String, u32)>>>, arg: u32) {
            let name = std::thread::current().name().unwrap_or_default().to_owned();
            if let Some(sender) = sender.get() {
                sender.lock().unwrap().send((name, arg)).unwrap();
            }
        }

        let (tx, rx) = mpsc::channel();
        SENDER.set(Mutex::new(tx)).unwrap();
        let status = service().pend_call(PendingCall::new(report, &SENDER, 7), 0);
        assert_eq!(status, Status::Ok);
        let (name, arg) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(name, TIMER_SERVICE_NAME);
        assert_eq!(arg, 7);
    }
}
