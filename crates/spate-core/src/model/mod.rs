//! Torrent records and status derivation.

pub mod settings;
pub mod transfer;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Closed set of status flags a torrent can carry.
///
/// `Active`/`Inactive` and `Complete` are orthogonal to the lifecycle
/// flags; a record always carries exactly one of the lifecycle flags
/// (`Downloading`, `Seeding`, `Stopped`, `Checking`) plus the applicable
/// orthogonal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFlag {
    Downloading,
    Seeding,
    Stopped,
    Checking,
    Error,
    Active,
    Inactive,
    Complete,
}

impl StatusFlag {
    /// All flags, in aggregate-key order.
    pub const ALL: [Self; 8] = [
        Self::Downloading,
        Self::Seeding,
        Self::Stopped,
        Self::Checking,
        Self::Error,
        Self::Active,
        Self::Inactive,
        Self::Complete,
    ];

    /// Stable key used in taxonomy maps and event payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Seeding => "seeding",
            Self::Stopped => "stopped",
            Self::Checking => "checking",
            Self::Error => "error",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Complete => "complete",
        }
    }
}

/// Raw per-torrent values exactly as reported by a daemon poll.
///
/// No derived data lives here; the snapshot store computes percentages,
/// status flags, and aggregates from these fields alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTorrent {
    pub hash: String,
    pub name: String,
    /// Daemon status message; non-empty signals an error condition.
    pub message: String,
    /// Daemon lifecycle state word (0 = stopped).
    pub state: i64,
    pub is_active: bool,
    pub is_complete: bool,
    pub is_hash_checking: bool,
    pub is_private: bool,
    pub size_bytes: u64,
    pub bytes_done: u64,
    pub up_rate: u64,
    pub down_rate: u64,
    pub up_total: u64,
    pub down_total: u64,
    pub ratio: f64,
    pub date_added: i64,
    pub date_created: i64,
    pub date_finished: i64,
    pub date_active: i64,
    pub peers_connected: u32,
    pub peers_total: u32,
    pub seeds_connected: u32,
    pub seeds_total: u32,
    pub priority: i64,
    pub directory: String,
    pub tags: Vec<String>,
    pub trackers: Vec<String>,
}

/// Authoritative per-torrent record held by the snapshot store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Stable daemon identity.
    pub hash: String,
    pub name: String,
    pub message: String,
    pub size_bytes: u64,
    /// Always `<= size_bytes`; clamped on ingest if the daemon disagrees.
    pub bytes_done: u64,
    pub up_total: u64,
    pub down_total: u64,
    pub up_rate: u64,
    pub down_rate: u64,
    pub ratio: f64,
    /// Recomputed from the byte counters, never trusted from input.
    pub percent_complete: f64,
    /// Seconds until completion at the current rate, when downloading.
    pub eta_seconds: Option<u64>,
    pub peers_connected: u32,
    pub peers_total: u32,
    pub seeds_connected: u32,
    pub seeds_total: u32,
    pub date_added: i64,
    pub date_created: i64,
    pub date_finished: i64,
    pub date_active: i64,
    pub status: BTreeSet<StatusFlag>,
    pub tags: Vec<String>,
    pub trackers: Vec<String>,
    pub directory: String,
    pub priority: i64,
    pub is_private: bool,
}

impl TorrentRecord {
    /// Build a fresh record from raw poll values.
    #[must_use]
    pub fn from_raw(raw: &RawTorrent) -> Self {
        let mut record = Self {
            hash: raw.hash.clone(),
            name: String::new(),
            message: String::new(),
            size_bytes: 0,
            bytes_done: 0,
            up_total: 0,
            down_total: 0,
            up_rate: 0,
            down_rate: 0,
            ratio: 0.0,
            percent_complete: 0.0,
            eta_seconds: None,
            peers_connected: 0,
            peers_total: 0,
            seeds_connected: 0,
            seeds_total: 0,
            date_added: 0,
            date_created: 0,
            date_finished: 0,
            date_active: 0,
            status: BTreeSet::new(),
            tags: Vec::new(),
            trackers: Vec::new(),
            directory: String::new(),
            priority: 0,
            is_private: false,
        };
        record.apply_raw(raw);
        record
    }

    /// Update this record in place from a fresh poll result.
    ///
    /// In-place mutation preserves object identity for consumers that
    /// cache references keyed by hash.
    pub fn apply_raw(&mut self, raw: &RawTorrent) {
        let bytes_done = if raw.bytes_done > raw.size_bytes {
            warn!(
                torrent_id = %raw.hash,
                bytes_done = raw.bytes_done,
                size_bytes = raw.size_bytes,
                "daemon reported more completed bytes than total; clamping"
            );
            raw.size_bytes
        } else {
            raw.bytes_done
        };

        self.name.clone_from(&raw.name);
        self.message.clone_from(&raw.message);
        self.size_bytes = raw.size_bytes;
        self.bytes_done = bytes_done;
        self.up_total = raw.up_total;
        self.down_total = raw.down_total;
        self.up_rate = raw.up_rate;
        self.down_rate = raw.down_rate;
        self.ratio = raw.ratio;
        self.percent_complete = percent_complete(bytes_done, raw.size_bytes);
        self.eta_seconds = eta_seconds(bytes_done, raw.size_bytes, raw.down_rate);
        self.peers_connected = raw.peers_connected;
        self.peers_total = raw.peers_total;
        self.seeds_connected = raw.seeds_connected;
        self.seeds_total = raw.seeds_total;
        self.date_added = raw.date_added;
        self.date_created = raw.date_created;
        self.date_finished = raw.date_finished;
        self.date_active = raw.date_active;
        self.status = derive_status(raw);
        self.tags.clone_from(&raw.tags);
        self.trackers.clone_from(&raw.trackers);
        self.directory.clone_from(&raw.directory);
        self.priority = raw.priority;
        self.is_private = raw.is_private;
    }

    /// Whether the record currently carries the given flag.
    #[must_use]
    pub fn has_status(&self, flag: StatusFlag) -> bool {
        self.status.contains(&flag)
    }
}

/// Completion percentage in `[0, 100]`, rounded to two decimals.
#[must_use]
pub fn percent_complete(bytes_done: u64, size_bytes: u64) -> f64 {
    if size_bytes == 0 {
        return 0.0;
    }
    let ratio = to_f64(bytes_done.min(size_bytes)) / to_f64(size_bytes);
    (ratio * 10_000.0).round() / 100.0
}

fn eta_seconds(bytes_done: u64, size_bytes: u64, down_rate: u64) -> Option<u64> {
    if down_rate == 0 || bytes_done >= size_bytes {
        return None;
    }
    Some((size_bytes - bytes_done) / down_rate)
}

const fn to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "u64 to f64 conversion is required for percentage reporting"
    )]
    {
        value as f64
    }
}

/// Derive the closed status-flag set from raw daemon values.
pub(crate) fn derive_status(raw: &RawTorrent) -> BTreeSet<StatusFlag> {
    let mut flags = BTreeSet::new();
    if raw.is_hash_checking {
        flags.insert(StatusFlag::Checking);
    } else if raw.state == 0 {
        flags.insert(StatusFlag::Stopped);
    } else if raw.is_complete {
        flags.insert(StatusFlag::Seeding);
    } else {
        flags.insert(StatusFlag::Downloading);
    }
    if !raw.message.is_empty() {
        flags.insert(StatusFlag::Error);
    }
    if raw.is_complete {
        flags.insert(StatusFlag::Complete);
    }
    if raw.up_rate > 0 || raw.down_rate > 0 {
        flags.insert(StatusFlag::Active);
    } else {
        flags.insert(StatusFlag::Inactive);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hash: &str) -> RawTorrent {
        RawTorrent {
            hash: hash.to_string(),
            name: format!("{hash}-name"),
            state: 1,
            size_bytes: 1_000,
            bytes_done: 500,
            directory: "/data/downloads".to_string(),
            ..RawTorrent::default()
        }
    }

    #[test]
    fn percent_is_recomputed_and_bounded() {
        let record = TorrentRecord::from_raw(&raw("A"));
        assert!((record.percent_complete - 50.0).abs() < f64::EPSILON);
        assert!(record.bytes_done <= record.size_bytes);

        let mut over = raw("B");
        over.bytes_done = 2_000;
        let record = TorrentRecord::from_raw(&over);
        assert_eq!(record.bytes_done, record.size_bytes);
        assert!((record.percent_complete - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_handles_zero_size() {
        let mut empty = raw("C");
        empty.size_bytes = 0;
        empty.bytes_done = 0;
        let record = TorrentRecord::from_raw(&empty);
        assert!(record.percent_complete.abs() < f64::EPSILON);
        assert!(record.eta_seconds.is_none());
    }

    #[test]
    fn status_derivation_covers_the_lifecycle() {
        let mut checking = raw("A");
        checking.is_hash_checking = true;
        assert!(derive_status(&checking).contains(&StatusFlag::Checking));

        let mut stopped = raw("B");
        stopped.state = 0;
        let flags = derive_status(&stopped);
        assert!(flags.contains(&StatusFlag::Stopped));
        assert!(flags.contains(&StatusFlag::Inactive));

        let mut seeding = raw("C");
        seeding.is_complete = true;
        seeding.up_rate = 100;
        let flags = derive_status(&seeding);
        assert!(flags.contains(&StatusFlag::Seeding));
        assert!(flags.contains(&StatusFlag::Complete));
        assert!(flags.contains(&StatusFlag::Active));

        let mut failed = raw("D");
        failed.message = "Tracker: [Failure reason \"unregistered\"]".to_string();
        assert!(derive_status(&failed).contains(&StatusFlag::Error));
    }

    #[test]
    fn eta_reflects_current_rate() {
        let mut downloading = raw("A");
        downloading.down_rate = 50;
        let record = TorrentRecord::from_raw(&downloading);
        assert_eq!(record.eta_seconds, Some(10));
    }

    #[test]
    fn apply_raw_updates_in_place() {
        let mut record = TorrentRecord::from_raw(&raw("A"));
        let mut next = raw("A");
        next.bytes_done = 1_000;
        next.is_complete = true;
        record.apply_raw(&next);
        assert!((record.percent_complete - 100.0).abs() < f64::EPSILON);
        assert!(record.has_status(StatusFlag::Complete));
    }
}
