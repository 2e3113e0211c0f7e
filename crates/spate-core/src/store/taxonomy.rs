//! Computed aggregate counts and sizes by status, tag, and tracker.
//!
//! Taxonomy is computed, not stored: the only constructor consumes the
//! record set, and nothing here accepts aggregate figures from callers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ConsistencyError;
use crate::model::{StatusFlag, TorrentRecord};
use crate::store::location::LocationNode;

/// Reserved filter key meaning "all torrents".
pub const ALL_KEY: &str = "";

/// Reserved tag bucket for torrents with no tags.
pub const UNTAGGED_KEY: &str = "untagged";

/// Count and total size for one aggregate bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    pub count: u64,
    pub size_bytes: u64,
}

impl AggregateEntry {
    fn absorb(&mut self, size_bytes: u64) {
        self.count += 1;
        self.size_bytes += size_bytes;
    }
}

/// Derived aggregates recomputed from the record set on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Taxonomy {
    status: BTreeMap<String, AggregateEntry>,
    tags: BTreeMap<String, AggregateEntry>,
    trackers: BTreeMap<String, AggregateEntry>,
    locations: LocationNode,
}

impl Taxonomy {
    /// Recompute all aggregates from the record set.
    ///
    /// The location tree is computed by the store (it carries its own
    /// cache) and handed in here.
    pub(crate) fn compute(
        records: &BTreeMap<String, TorrentRecord>,
        locations: LocationNode,
    ) -> Self {
        let mut status: BTreeMap<String, AggregateEntry> = BTreeMap::new();
        status.insert(ALL_KEY.to_string(), AggregateEntry::default());
        for flag in StatusFlag::ALL {
            status.insert(flag.as_str().to_string(), AggregateEntry::default());
        }

        let mut tags: BTreeMap<String, AggregateEntry> = BTreeMap::new();
        tags.insert(ALL_KEY.to_string(), AggregateEntry::default());
        tags.insert(UNTAGGED_KEY.to_string(), AggregateEntry::default());

        let mut trackers: BTreeMap<String, AggregateEntry> = BTreeMap::new();
        trackers.insert(ALL_KEY.to_string(), AggregateEntry::default());

        for record in records.values() {
            let size = record.size_bytes;
            status
                .get_mut(ALL_KEY)
                .expect("all bucket present")
                .absorb(size);
            for flag in &record.status {
                status
                    .get_mut(flag.as_str())
                    .expect("status buckets pre-seeded")
                    .absorb(size);
            }

            tags.get_mut(ALL_KEY)
                .expect("all bucket present")
                .absorb(size);
            if record.tags.is_empty() {
                tags.get_mut(UNTAGGED_KEY)
                    .expect("untagged bucket present")
                    .absorb(size);
            } else {
                for tag in &record.tags {
                    tags.entry(tag.clone()).or_default().absorb(size);
                }
            }

            trackers
                .get_mut(ALL_KEY)
                .expect("all bucket present")
                .absorb(size);
            for tracker in &record.trackers {
                trackers
                    .entry(tracker_key(tracker).to_string())
                    .or_default()
                    .absorb(size);
            }
        }

        Self {
            status,
            tags,
            trackers,
            locations,
        }
    }

    /// Status buckets, including the reserved "all" key.
    #[must_use]
    pub fn status(&self) -> &BTreeMap<String, AggregateEntry> {
        &self.status
    }

    /// Tag buckets, including the reserved "all" and "untagged" keys.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, AggregateEntry> {
        &self.tags
    }

    /// Tracker-host buckets, including the reserved "all" key.
    #[must_use]
    pub fn trackers(&self) -> &BTreeMap<String, AggregateEntry> {
        &self.trackers
    }

    /// Directory rollup tree.
    #[must_use]
    pub fn locations(&self) -> &LocationNode {
        &self.locations
    }

    /// Cross-check the aggregates against the record set they were
    /// computed from.
    pub(crate) fn verify(
        &self,
        records: &BTreeMap<String, TorrentRecord>,
    ) -> Result<(), ConsistencyError> {
        let total = self.status.get(ALL_KEY).map_or(0, |entry| entry.count);
        if total != records.len() as u64 {
            return Err(ConsistencyError {
                detail: format!(
                    "status 'all' bucket counts {total} torrents but the record set holds {}",
                    records.len()
                ),
            });
        }

        let active = self
            .status
            .get(StatusFlag::Active.as_str())
            .map_or(0, |entry| entry.count);
        let with_rate = records
            .values()
            .filter(|record| record.up_rate > 0 || record.down_rate > 0)
            .count() as u64;
        if active != with_rate {
            return Err(ConsistencyError {
                detail: format!(
                    "active bucket counts {active} torrents but {with_rate} report nonzero rates"
                ),
            });
        }
        Ok(())
    }
}

/// Reduce a tracker URI to its host for aggregation.
fn tracker_key(uri: &str) -> &str {
    let host = uri.split("://").nth(1).unwrap_or(uri);
    let end = host.find(['/', ':']).unwrap_or(host.len());
    &host[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTorrent;

    fn records(raws: &[RawTorrent]) -> BTreeMap<String, TorrentRecord> {
        raws.iter()
            .map(|raw| (raw.hash.clone(), TorrentRecord::from_raw(raw)))
            .collect()
    }

    fn raw(hash: &str, size: u64) -> RawTorrent {
        RawTorrent {
            hash: hash.to_string(),
            name: hash.to_string(),
            state: 1,
            size_bytes: size,
            ..RawTorrent::default()
        }
    }

    #[test]
    fn reserved_buckets_exist_even_when_zero() {
        let taxonomy = Taxonomy::compute(&BTreeMap::new(), LocationNode::empty());
        assert_eq!(taxonomy.tags().get(ALL_KEY), Some(&AggregateEntry::default()));
        assert_eq!(
            taxonomy.tags().get(UNTAGGED_KEY),
            Some(&AggregateEntry::default())
        );
        assert!(taxonomy.status().contains_key("seeding"));
        assert!(taxonomy.trackers().contains_key(ALL_KEY));
    }

    #[test]
    fn tag_and_tracker_buckets_accumulate_sizes() {
        let mut first = raw("A", 100);
        first.tags = vec!["tv".to_string()];
        first.trackers = vec!["https://tracker.example.org:443/announce".to_string()];
        let second = raw("B", 50);

        let records = records(&[first, second]);
        let taxonomy = Taxonomy::compute(&records, LocationNode::empty());

        assert_eq!(taxonomy.tags().get("tv").map(|entry| entry.count), Some(1));
        assert_eq!(
            taxonomy.tags().get(UNTAGGED_KEY).map(|entry| entry.count),
            Some(1)
        );
        assert_eq!(
            taxonomy.tags().get(ALL_KEY),
            Some(&AggregateEntry {
                count: 2,
                size_bytes: 150
            })
        );
        assert_eq!(
            taxonomy
                .trackers()
                .get("tracker.example.org")
                .map(|entry| entry.count),
            Some(1)
        );
    }

    #[test]
    fn active_bucket_matches_nonzero_rates() {
        let mut busy = raw("A", 100);
        busy.down_rate = 10;
        let idle = raw("B", 100);
        let records = records(&[busy, idle]);
        let taxonomy = Taxonomy::compute(&records, LocationNode::empty());

        assert_eq!(
            taxonomy.status().get("active").map(|entry| entry.count),
            Some(1)
        );
        assert_eq!(
            taxonomy.status().get("inactive").map(|entry| entry.count),
            Some(1)
        );
        assert!(taxonomy.verify(&records).is_ok());
    }
}
