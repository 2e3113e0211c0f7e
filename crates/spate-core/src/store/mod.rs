//! Authoritative torrent snapshot store.
//!
//! # Design
//! - The store owns the live `hash → TorrentRecord` map and is mutated
//!   only by applying poll results; readers work from `Arc<Snapshot>`
//!   point-in-time references.
//! - Aggregates are fully recomputed from the record set on every apply;
//!   only the directory tree carries a short-circuit cache, keyed on the
//!   sorted hash list (the set of ids, not their contents).

pub mod location;
pub mod taxonomy;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::error;

use crate::error::ConsistencyError;
use crate::model::{RawTorrent, StatusFlag, TorrentRecord};
use location::LocationNode;
use taxonomy::Taxonomy;

/// Immutable point-in-time view of all torrents plus derived aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    revision: u64,
    torrents: BTreeMap<String, TorrentRecord>,
    taxonomy: Taxonomy,
}

impl Snapshot {
    /// Monotonically increasing poll revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All known torrents, keyed by hash.
    #[must_use]
    pub fn torrents(&self) -> &BTreeMap<String, TorrentRecord> {
        &self.torrents
    }

    /// Derived aggregates for this snapshot.
    #[must_use]
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Look up a single torrent by hash.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&TorrentRecord> {
        self.torrents.get(hash)
    }

    /// Cross-check derived aggregates against the record set.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsistencyError`] when recomputation diverged from the
    /// raw records; this signals a programming defect, not a user error.
    pub fn verify(&self) -> Result<(), ConsistencyError> {
        self.taxonomy.verify(&self.torrents)
    }
}

/// Result of applying one poll cycle.
#[derive(Debug)]
pub struct PollOutcome {
    /// The new authoritative snapshot.
    pub snapshot: Arc<Snapshot>,
    /// Hashes whose records were created or materially updated.
    pub changed: Vec<String>,
    /// Hashes the daemon no longer reports.
    pub removed: Vec<String>,
    /// Hashes that crossed to 100% this cycle outside a hash check.
    pub finished: Vec<String>,
}

/// Owner of the authoritative torrent map.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    records: BTreeMap<String, TorrentRecord>,
    revision: u64,
    tree_key: Option<Vec<String>>,
    tree_cache: Option<LocationNode>,
    tree_builds: u64,
}

impl SnapshotStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fresh poll result, updating records in place and
    /// recomputing derived aggregates.
    pub fn apply_poll(&mut self, raws: &[RawTorrent]) -> PollOutcome {
        let incoming: BTreeSet<&str> = raws.iter().map(|raw| raw.hash.as_str()).collect();
        let removed: Vec<String> = self
            .records
            .keys()
            .filter(|hash| !incoming.contains(hash.as_str()))
            .cloned()
            .collect();
        for hash in &removed {
            self.records.remove(hash);
        }

        let mut changed = Vec::new();
        let mut finished = Vec::new();
        for raw in raws {
            if let Some(record) = self.records.get_mut(&raw.hash) {
                let before = record.clone();
                record.apply_raw(raw);
                if *record != before {
                    changed.push(raw.hash.clone());
                }
                if before.percent_complete < 100.0
                    && record.percent_complete >= 100.0
                    && !before.has_status(StatusFlag::Checking)
                {
                    finished.push(raw.hash.clone());
                }
            } else {
                self.records
                    .insert(raw.hash.clone(), TorrentRecord::from_raw(raw));
                changed.push(raw.hash.clone());
            }
        }

        let tree = self.location_tree();
        let taxonomy = Taxonomy::compute(&self.records, tree);
        self.revision += 1;

        let snapshot = Snapshot {
            revision: self.revision,
            torrents: self.records.clone(),
            taxonomy,
        };
        if let Err(err) = snapshot.verify() {
            error!(error = %err, revision = self.revision, "aggregate recomputation diverged");
        }

        PollOutcome {
            snapshot: Arc::new(snapshot),
            changed,
            removed,
            finished,
        }
    }

    /// Number of torrents currently known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store knows no torrents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many times the directory tree has actually been rebuilt.
    #[must_use]
    pub fn tree_builds(&self) -> u64 {
        self.tree_builds
    }

    fn location_tree(&mut self) -> LocationNode {
        let key: Vec<String> = self.records.keys().cloned().collect();
        if self.tree_key.as_ref() == Some(&key)
            && let Some(cached) = &self.tree_cache
        {
            return cached.clone();
        }
        let tree = location::build_tree(
            self.records
                .values()
                .map(|record| (record.directory.as_str(), record.size_bytes)),
        );
        self.tree_builds += 1;
        self.tree_key = Some(key);
        self.tree_cache = Some(tree.clone());
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hash: &str, done: u64, size: u64) -> RawTorrent {
        RawTorrent {
            hash: hash.to_string(),
            name: format!("{hash}-name"),
            state: 1,
            size_bytes: size,
            bytes_done: done,
            directory: "/data/downloads".to_string(),
            ..RawTorrent::default()
        }
    }

    #[test]
    fn identical_polls_are_idempotent_and_hit_the_tree_cache() {
        let mut store = SnapshotStore::new();
        let raws = vec![raw("A", 500, 1_000), raw("B", 100, 100)];

        let first = store.apply_poll(&raws);
        assert_eq!(first.changed.len(), 2);
        assert_eq!(store.tree_builds(), 1);

        let second = store.apply_poll(&raws);
        assert!(second.changed.is_empty());
        assert!(second.removed.is_empty());
        assert_eq!(
            first.snapshot.taxonomy(),
            second.snapshot.taxonomy(),
            "aggregates must be identical for identical input"
        );
        assert_eq!(store.tree_builds(), 1, "tree must come from the cache");
    }

    #[test]
    fn missing_hashes_are_removed() {
        let mut store = SnapshotStore::new();
        store.apply_poll(&[raw("A", 0, 10), raw("B", 0, 10)]);
        let outcome = store.apply_poll(&[raw("A", 0, 10)]);
        assert_eq!(outcome.removed, vec!["B".to_string()]);
        assert!(outcome.snapshot.get("B").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn id_set_change_rebuilds_the_tree() {
        let mut store = SnapshotStore::new();
        store.apply_poll(&[raw("A", 0, 10)]);
        store.apply_poll(&[raw("A", 0, 10), raw("B", 0, 10)]);
        assert_eq!(store.tree_builds(), 2);
    }

    #[test]
    fn completion_transition_is_finished_exactly_once() {
        let mut store = SnapshotStore::new();
        let half = store.apply_poll(&[raw("A", 500, 1_000)]);
        assert!(half.finished.is_empty());

        let mut done = raw("A", 1_000, 1_000);
        done.is_complete = true;
        let outcome = store.apply_poll(std::slice::from_ref(&done));
        assert_eq!(outcome.finished, vec!["A".to_string()]);
        assert_eq!(outcome.changed, vec!["A".to_string()]);

        let again = store.apply_poll(&[done]);
        assert!(again.finished.is_empty(), "no re-notification at rest");
    }

    #[test]
    fn checking_transition_is_not_finished() {
        let mut store = SnapshotStore::new();
        let mut checking = raw("A", 500, 1_000);
        checking.is_hash_checking = true;
        store.apply_poll(std::slice::from_ref(&checking));

        let outcome = store.apply_poll(&[raw("A", 1_000, 1_000)]);
        assert!(
            outcome.finished.is_empty(),
            "completion during a hash check is not a finish event"
        );
    }

    #[test]
    fn snapshots_are_point_in_time() {
        let mut store = SnapshotStore::new();
        let before = store.apply_poll(&[raw("A", 100, 1_000)]).snapshot;
        let after = store.apply_poll(&[raw("A", 900, 1_000)]).snapshot;
        let a_before = before.get("A").expect("record present");
        let a_after = after.get("A").expect("record present");
        assert_eq!(a_before.bytes_done, 100);
        assert_eq!(a_after.bytes_done, 900);
        assert!(after.revision() > before.revision());
    }

}
