//! Event payload bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use spate_core::{DaemonSettings, Taxonomy, TorrentRecord};
use spate_history::EraSeries;

pub use spate_core::TransferSummary;

/// Complete gateway state sent on (re)subscription.
#[derive(Debug, Clone, Serialize)]
pub struct FullUpdate {
    /// Snapshot revision these torrents were taken from.
    pub revision: u64,
    /// All known torrents, keyed by hash.
    pub torrents: BTreeMap<String, TorrentRecord>,
    /// Daemon-wide settings.
    pub settings: DaemonSettings,
    /// Aggregate transfer figures.
    pub transfer: TransferSummary,
    /// Rate history, one series per era.
    pub history: Vec<EraSeries>,
    /// Aggregate counts and sizes.
    pub taxonomy: Taxonomy,
}
