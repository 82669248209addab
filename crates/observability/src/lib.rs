//! Process-wide logging setup for the clinic session layer.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings};

/// JSON logs filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    tracing::init(LogSettings::default());
}

/// Human-readable logs captured by the test harness.
pub fn init_for_tests() {
    tracing::init(LogSettings::for_tests());
}
