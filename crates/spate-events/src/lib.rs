//! Outbound event model for gateway subscribers.
//!
//! The gateway pushes either full-state or diff events to each open
//! subscriber channel. Every subscriber carries its own monotonic
//! sequence counter per event kind, so consumers can detect gaps per
//! stream without coordinating across kinds.

pub mod payload;
pub mod subscriber;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use payload::{FullUpdate, TransferSummary};
pub use subscriber::{Liveness, SequenceCounters, SubscriberChannel, Subscription};

use spate_core::{PatchOp, Taxonomy};
use spate_history::EraSeries;

/// Typed events surfaced to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Complete gateway state; sent once per (re)subscription.
    FullUpdate(Box<FullUpdate>),
    /// Structural patch transforming the previously sent torrent map.
    DiffUpdate {
        /// Add/replace/remove operations, in application order.
        ops: Vec<PatchOp>,
    },
    /// Aggregate transfer rates and totals changed.
    TransferSummary(TransferSummary),
    /// Fresh transfer-rate history series.
    History {
        /// One series per era, finest first.
        series: Vec<EraSeries>,
    },
    /// Aggregate counts/sizes changed.
    Taxonomy(Taxonomy),
    /// Daemon reachability changed.
    Connectivity {
        /// Whether the daemon answered the most recent poll.
        connected: bool,
    },
    /// Number of unseen finished-torrent notifications changed.
    NotificationCount {
        /// Current notification count.
        count: u64,
    },
}

impl Event {
    /// Machine-friendly discriminator, also the sequence-counter key.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Event::FullUpdate(_) => "full_update",
            Event::DiffUpdate { .. } => "diff_update",
            Event::TransferSummary(_) => "transfer_summary",
            Event::History { .. } => "history",
            Event::Taxonomy(_) => "taxonomy",
            Event::Connectivity { .. } => "connectivity",
            Event::NotificationCount { .. } => "notification_count",
        }
    }
}

/// Metadata wrapper around events: per-kind sequence id and emission
/// timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Monotonic sequence number within this subscriber and event kind.
    pub id: u64,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_discriminators() {
        let event = Event::Connectivity { connected: true };
        assert_eq!(event.kind(), "connectivity");
        let event = Event::DiffUpdate { ops: Vec::new() };
        assert_eq!(event.kind(), "diff_update");
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = Event::NotificationCount { count: 3 };
        let json = serde_json::to_value(&event).expect("serializable event");
        assert_eq!(json["type"], "notification_count");
        assert_eq!(json["count"], 3);
    }
}
