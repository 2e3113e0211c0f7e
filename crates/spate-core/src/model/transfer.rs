//! Aggregate transfer figures.

use serde::{Deserialize, Serialize};

/// Global transfer rates, totals, and throttle caps across all torrents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    /// Current global upload rate, bytes per second.
    pub up_rate: u64,
    /// Current global download rate, bytes per second.
    pub down_rate: u64,
    /// Total bytes uploaded this daemon session.
    pub up_total: u64,
    /// Total bytes downloaded this daemon session.
    pub down_total: u64,
    /// Global upload cap; zero means unlimited.
    pub up_throttle: u64,
    /// Global download cap; zero means unlimited.
    pub down_throttle: u64,
}
