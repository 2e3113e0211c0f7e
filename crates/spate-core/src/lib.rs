//! Torrent domain model, snapshot store, and structural diffing.
//!
//! Layout: `model` (records and status derivation), `store` (authoritative
//! snapshot plus computed taxonomy), `diff` (JSON-patch-style structural
//! diffs between snapshots).

pub mod diff;
pub mod error;
pub mod model;
pub mod store;

pub use diff::{PatchOp, diff};
pub use error::ConsistencyError;
pub use model::settings::DaemonSettings;
pub use model::transfer::TransferSummary;
pub use model::{RawTorrent, StatusFlag, TorrentRecord};
pub use store::{PollOutcome, Snapshot, SnapshotStore};
pub use store::location::LocationNode;
pub use store::taxonomy::{ALL_KEY, AggregateEntry, Taxonomy, UNTAGGED_KEY};
