mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tactility_core::config::TIMER_SERVICE_NAME;
use tactility_core::kernel::{self, MAX_TICKS};
use tactility_core::sync::Semaphore;
use tactility_core::thread::Priority;
use tactility_core::timer::{Timer, Type};

fn counting_timer(timer_type: Type, interval: u32) -> (Timer, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let timer = Timer::new(timer_type, interval, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (timer, hits)
}

#[test]
fn periodic_timer_fires_repeatedly() {
    let (timer, hits) = counting_timer(Type::Periodic, 10);
    assert!(timer.start());
    assert!(timer.is_running());
    kernel::delay_millis(105);
    assert!(timer.stop());
    assert!(!timer.is_running());

    let fired = hits.load(Ordering::SeqCst);
    assert!((3..=11).contains(&fired), "fired {fired} times");

    kernel::delay_millis(30);
    assert_eq!(hits.load(Ordering::SeqCst), fired);
}

#[test]
fn once_timer_fires_exactly_once() {
    let (timer, hits) = counting_timer(Type::Once, 5);
    assert!(timer.start());
    kernel::delay_millis(100);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!timer.is_running());

    assert!(timer.reset());
    kernel::delay_millis(100);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn callbacks_run_on_the_timer_service() {
    let seen = Arc::new(std::sync::Mutex::new(None));
    let done = Arc::new(Semaphore::new(1, 0));
    let timer = {
        let seen = Arc::clone(&seen);
        let done = Arc::clone(&done);
        Timer::new(Type::Once, 1, move || {
            *seen.lock().unwrap() = std::thread::current().name().map(str::to_owned);
            done.release();
        })
    };
    timer.set_callback_priority(Priority::High);
    assert!(timer.start());
    assert!(done.acquire(MAX_TICKS));
    assert_eq!(seen.lock().unwrap().as_deref(), Some(TIMER_SERVICE_NAME));
}

static PENDING_HITS: AtomicU32 = AtomicU32::new(0);

fn record_pending(hits: &'static AtomicU32, arg: u32) {
    hits.fetch_add(arg, Ordering::SeqCst);
}

#[test]
fn pending_callback_from_interrupt_runs_on_the_service() {
    let (timer, _hits) = counting_timer(Type::Once, 1_000);
    assert!(kernel::simulate_isr(|| {
        timer.set_pending_callback_from_isr(record_pending, &PENDING_HITS, 3)
    }));
    assert!(timer.set_pending_callback(record_pending, &PENDING_HITS, 4, MAX_TICKS));

    for _ in 0..100 {
        if PENDING_HITS.load(Ordering::SeqCst) == 7 {
            break;
        }
        kernel::delay_millis(5);
    }
    assert_eq!(PENDING_HITS.load(Ordering::SeqCst), 7);
}

#[test]
fn service_outlives_a_panicking_callback() {
    let failing = Timer::new(Type::Once, 1, || panic!("callback failed"));
    assert!(failing.start());
    kernel::delay_millis(20);

    let (timer, hits) = counting_timer(Type::Once, 1);
    assert!(timer.start());
    kernel::delay_millis(100);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        drop(failing);
        tx.send(()).unwrap();
    });
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_ok());
}
