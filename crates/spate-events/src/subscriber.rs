//! Per-subscriber channel plumbing and liveness.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Event, EventEnvelope};

/// Subscriber lifecycle.
///
/// A new subscriber becomes `Streaming` once its full-state event has
/// been delivered. A closed subscriber never streams again: a client
/// returning from idleness re-subscribes and receives a fresh full
/// snapshot rather than resuming diffs from a stale cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Channel open, full state not yet delivered.
    New,
    /// Receiving diff and change events.
    Streaming,
    /// Deregistered; no further events will be delivered.
    Closed,
}

/// Monotonic sequence numbers, one counter per event kind.
#[derive(Debug, Default)]
pub struct SequenceCounters {
    counters: HashMap<&'static str, u64>,
}

impl SequenceCounters {
    /// Next sequence number for the given event kind.
    pub fn next(&mut self, kind: &'static str) -> u64 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// Sending half of one subscriber's event channel, owned by the gateway.
#[derive(Debug)]
pub struct SubscriberChannel {
    id: Uuid,
    sender: mpsc::UnboundedSender<EventEnvelope>,
    sequences: SequenceCounters,
    liveness: Liveness,
    last_activity: Instant,
}

impl SubscriberChannel {
    /// Open a new subscriber channel pair.
    #[must_use]
    pub fn open() -> (Self, Subscription) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        (
            Self {
                id,
                sender,
                sequences: SequenceCounters::default(),
                liveness: Liveness::New,
                last_activity: Instant::now(),
            },
            Subscription { id, receiver },
        )
    }

    /// Stable subscriber identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    /// Deliver an event, assigning its per-kind sequence number.
    ///
    /// Returns `false` when the channel is closed (either explicitly or
    /// because the receiving side hung up), in which case the event was
    /// not delivered and the channel will accept nothing further.
    pub fn send(&mut self, event: Event) -> bool {
        if self.liveness == Liveness::Closed {
            return false;
        }
        let is_full = matches!(event, Event::FullUpdate(_));
        let envelope = EventEnvelope {
            id: self.sequences.next(event.kind()),
            timestamp: Utc::now(),
            event,
        };
        if self.sender.send(envelope).is_err() {
            self.liveness = Liveness::Closed;
            return false;
        }
        if is_full {
            self.liveness = Liveness::Streaming;
        }
        true
    }

    /// Record consumer activity (heartbeat/visibility signal).
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the consumer last signalled activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Close the channel; no further events will be accepted.
    pub fn close(&mut self) {
        self.liveness = Liveness::Closed;
    }
}

/// Receiving half handed to the consumer.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<EventEnvelope>,
}

impl Subscription {
    /// Stable subscriber identity, used for heartbeats and unsubscribe.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receive the next event; `None` once the gateway has closed the
    /// channel.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_monotonic_per_kind() {
        let mut counters = SequenceCounters::default();
        assert_eq!(counters.next("diff_update"), 1);
        assert_eq!(counters.next("diff_update"), 2);
        assert_eq!(counters.next("taxonomy"), 1);
        assert_eq!(counters.next("diff_update"), 3);
    }

    #[tokio::test]
    async fn full_update_transitions_to_streaming() {
        let (mut channel, _subscription) = SubscriberChannel::open();
        assert_eq!(channel.liveness(), Liveness::New);

        let snapshot = spate_core::SnapshotStore::new().apply_poll(&[]).snapshot;
        let full = crate::FullUpdate {
            revision: snapshot.revision(),
            torrents: snapshot.torrents().clone(),
            settings: spate_core::DaemonSettings::default(),
            transfer: crate::TransferSummary::default(),
            history: Vec::new(),
            taxonomy: snapshot.taxonomy().clone(),
        };
        assert!(channel.send(Event::FullUpdate(Box::new(full))));
        assert_eq!(channel.liveness(), Liveness::Streaming);
    }

    #[tokio::test]
    async fn send_assigns_per_kind_ids() {
        let (mut channel, mut subscription) = SubscriberChannel::open();
        assert_eq!(channel.liveness(), Liveness::New);

        assert!(channel.send(Event::Connectivity { connected: true }));
        assert!(channel.send(Event::Connectivity { connected: false }));
        assert!(channel.send(Event::NotificationCount { count: 1 }));

        let first = subscription.next().await.expect("event");
        assert_eq!(first.id, 1);
        let second = subscription.next().await.expect("event");
        assert_eq!(second.id, 2);
        let third = subscription.next().await.expect("event");
        assert_eq!(third.id, 1, "counters are independent per kind");
    }

    #[tokio::test]
    async fn dropped_receiver_closes_the_channel() {
        let (mut channel, subscription) = SubscriberChannel::open();
        drop(subscription);
        assert!(!channel.send(Event::Connectivity { connected: true }));
        assert_eq!(channel.liveness(), Liveness::Closed);
        assert!(!channel.send(Event::NotificationCount { count: 1 }));
    }

    #[test]
    fn close_is_terminal() {
        let (mut channel, _subscription) = SubscriberChannel::open();
        channel.close();
        assert!(!channel.send(Event::Connectivity { connected: true }));
        assert_eq!(channel.liveness(), Liveness::Closed);
    }
}
