//! Global daemon settings surfaced to subscribers.

use serde::{Deserialize, Serialize};

/// Daemon-wide settings fetched from the daemon and relayed to
/// collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSettings {
    /// Default download directory for new torrents.
    pub default_directory: String,
    /// Listening port range as reported by the daemon (e.g. `6881-6999`).
    pub port_range: String,
    /// Global download cap in bytes per second; zero means unlimited.
    pub down_throttle_max: u64,
    /// Global upload cap in bytes per second; zero means unlimited.
    pub up_throttle_max: u64,
}
