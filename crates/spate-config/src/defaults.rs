//! Default values applied when the config document omits fields.

/// Poll cadence against the daemon; aligned with the finest history era.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// How long a subscriber may stay silent before its stream is closed.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5 * 60 * 1_000;

/// Default logging level when `RUST_LOG` and the config are silent.
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub(crate) fn poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

pub(crate) fn log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
