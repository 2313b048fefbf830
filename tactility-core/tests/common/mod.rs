//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Mutex, Once};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    records: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

/// Install the capturing logger for this test binary.
pub fn init_logging() {
    INIT.call_once(|| {
        log::set_logger(&CAPTURE).expect("logger already installed");
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Number of captured records at `level` whose message contains `needle`.
pub fn count_logs(level: Level, needle: &str) -> usize {
    CAPTURE
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(record_level, message)| *record_level == level && message.contains(needle))
        .count()
}

/// Iteration count for stress tests, raised by `cargo xtask stress`.
pub fn stress_iterations(default: usize) -> usize {
    std::env::var("TACTILITY_STRESS_ITERATIONS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
