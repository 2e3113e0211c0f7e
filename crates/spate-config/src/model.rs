//! Typed configuration documents.
//!
//! # Design
//! - Pure data carriers; validation lives in `validate.rs` and IO in
//!   `loader.rs`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Where the gateway reaches its daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonEndpoint {
    /// TCP endpoint.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Local socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: PathBuf,
    },
}

/// Logging knobs forwarded to telemetry initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level string (e.g. `info`, `debug`).
    #[serde(default = "defaults::log_level")]
    pub level: String,
    /// Output format (`json` or `pretty`); inferred from the build when
    /// absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            format: None,
        }
    }
}

/// Top-level gateway configuration, one document per daemon-user pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Daemon endpoint this session talks to.
    pub daemon: DaemonEndpoint,
    /// Poll cadence in milliseconds.
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Subscriber idle timeout in milliseconds.
    #[serde(default = "defaults::idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl GatewayConfig {
    /// Poll cadence as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Subscriber idle timeout as a duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}
