//! Tick clock, delays and execution-context queries.
//!
//! Ticks count from the first time the clock is read in this process and wrap
//! around at `u32::MAX`, like the FreeRTOS tick counter.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::config::TICK_RATE_HZ;
use crate::port::{isr, task};
use crate::status::Status;

/// Scheduler tick count / timeout in ticks.
pub type TickType = u32;

/// Timeout sentinel meaning "wait forever" (`portMAX_DELAY`).
pub const MAX_TICKS: TickType = TickType::MAX;

/// Platform the kernel is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// An ESP32-class device.
    Esp,
    /// The desktop simulator (host port).
    Simulator,
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

/// Tick count corresponding to `instant`.
pub(crate) fn ticks_at(instant: Instant) -> TickType {
    let elapsed = instant.saturating_duration_since(epoch());
    let ticks = elapsed.as_millis() * u128::from(TICK_RATE_HZ) / 1000;
    // Truncation is the wrap-around of the tick counter.
    ticks as TickType
}

/// Wall-clock length of `ticks`.
pub(crate) fn ticks_to_duration(ticks: TickType) -> Duration {
    Duration::from_millis(u64::from(ticks) * 1000 / u64::from(TICK_RATE_HZ))
}

/// Current tick count. Safe to call from interrupt context.
pub fn get_ticks() -> TickType {
    ticks_at(Instant::now())
}

/// Tick frequency in Hz.
pub const fn get_tick_frequency() -> u32 {
    TICK_RATE_HZ
}

/// Convert milliseconds to ticks, saturating at [`MAX_TICKS`].
pub fn millis_to_ticks(milliseconds: u32) -> TickType {
    let ticks = u64::from(milliseconds) * u64::from(TICK_RATE_HZ) / 1000;
    TickType::try_from(ticks).unwrap_or(MAX_TICKS)
}

/// Convert ticks to milliseconds, saturating at `u32::MAX`.
pub fn ticks_to_millis(ticks: TickType) -> u32 {
    let millis = u64::from(ticks) * 1000 / u64::from(TICK_RATE_HZ);
    u32::try_from(millis).unwrap_or(u32::MAX)
}

/// Block the calling task for `ticks`. Zero yields the processor.
///
/// # Panics
///
/// When called from interrupt context.
pub fn delay_ticks(ticks: TickType) {
    assert!(!is_isr(), "delay_ticks called from interrupt context");
    if ticks == 0 {
        task::yield_now();
    } else {
        std::thread::sleep(ticks_to_duration(ticks));
    }
}

/// Block the calling task for at least `milliseconds`.
pub fn delay_millis(milliseconds: u32) {
    delay_ticks(millis_to_ticks(milliseconds));
}

/// Busy-wait style delay for short intervals.
pub fn delay_micros(microseconds: u32) {
    std::thread::sleep(Duration::from_micros(u64::from(microseconds)));
}

/// Block until the tick counter reaches `tick`.
///
/// Returns [`Status::ErrorParameter`] when `tick` is now or already in the
/// past (modulo wrap-around, a target more than half the counter range away
/// counts as past).
///
/// # Panics
///
/// When called from interrupt context.
pub fn delay_until_tick(tick: TickType) -> Status {
    assert!(!is_isr(), "delay_until_tick called from interrupt context");
    let delay = tick.wrapping_sub(get_ticks());
    if delay == 0 || delay >> (TickType::BITS - 1) != 0 {
        return Status::ErrorParameter;
    }
    std::thread::sleep(ticks_to_duration(delay));
    Status::Ok
}

/// Returns `true` when called from (simulated) interrupt context.
#[inline]
pub fn is_isr() -> bool {
    isr::in_isr()
}

/// Returns `true` once the scheduler is running.
///
/// The host port schedules tasks from process start.
pub fn is_running() -> bool {
    true
}

pub fn get_platform() -> Platform {
    Platform::Simulator
}

/// Run `handler` on the calling thread as if it were an interrupt handler.
///
/// Inside `handler`, [`is_isr`] returns `true` and only the `*_from_isr`
/// entry points may be used.
///
/// ```
/// use tactility_core::kernel;
///
/// assert!(!kernel::is_isr());
/// assert!(kernel::simulate_isr(kernel::is_isr));
/// ```
pub fn simulate_isr<R>(handler: impl FnOnce() -> R) -> R {
    isr::enter(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_conversions() {
        assert_eq!(get_tick_frequency(), 1000);
        assert_eq!(millis_to_ticks(250), 250);
        assert_eq!(ticks_to_millis(250), 250);
        assert_eq!(ticks_to_duration(5), Duration::from_millis(5));
    }

    #[test]
    fn ticks_advance_with_delay() {
        let before = get_ticks();
        delay_millis(15);
        let elapsed = get_ticks().wrapping_sub(before);
        assert!(elapsed >= 14, "elapsed {elapsed} ticks");
    }

    #[test]
    fn delay_until_tick_rejects_past() {
        let now = get_ticks();
        assert_eq!(delay_until_tick(now.wrapping_sub(1)), Status::ErrorParameter);
        assert_eq!(delay_until_tick(get_ticks().wrapping_add(5)), Status::Ok);
    }

    #[test]
    #[should_panic(expected = "interrupt context")]
    fn delay_in_isr_panics() {
        simulate_isr(|| delay_ticks(1));
    }

    #[test]
    fn platform_is_simulator() {
        assert_eq!(get_platform(), Platform::Simulator);
        assert!(is_running());
    }
}
