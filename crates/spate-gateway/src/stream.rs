//! Subscriber registry and change propagation.
//!
//! Diffs are computed against the last broadcast torrent document, so a
//! subscriber always receives diffs whose base it has already seen: a
//! new subscriber gets the current full state first, and the baseline
//! only advances inside the poll cycle. Connectivity, notification,
//! transfer, and taxonomy events each fire only when their source value
//! changes.

use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use spate_core::{Snapshot, Taxonomy, TransferSummary, diff};
use spate_events::{Event, FullUpdate, Liveness, SubscriberChannel, Subscription};
use uuid::Uuid;

/// Fan-out state for one gateway session.
pub(crate) struct ActivityStream {
    subscribers: Vec<SubscriberChannel>,
    baseline: JsonValue,
    last_taxonomy: Option<Taxonomy>,
    last_transfer: Option<TransferSummary>,
    last_connected: Option<bool>,
    last_notifications: Option<u64>,
}

impl ActivityStream {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            baseline: JsonValue::Object(serde_json::Map::new()),
            last_taxonomy: None,
            last_transfer: None,
            last_connected: None,
            last_notifications: None,
        }
    }

    /// Register a new subscriber and deliver its full-state event.
    pub(crate) fn subscribe(&mut self, full: FullUpdate) -> Subscription {
        let (mut channel, subscription) = SubscriberChannel::open();
        let id = channel.id();
        channel.send(Event::FullUpdate(Box::new(full)));
        self.subscribers.push(channel);
        info!(subscriber = %id, "subscriber attached");
        subscription
    }

    /// Record consumer activity for the given subscriber.
    pub(crate) fn heartbeat(&mut self, subscriber: Uuid) {
        if let Some(channel) = self
            .subscribers
            .iter_mut()
            .find(|channel| channel.id() == subscriber)
        {
            channel.touch();
        }
    }

    /// Close and deregister a subscriber; nothing further is delivered.
    pub(crate) fn unsubscribe(&mut self, subscriber: Uuid) {
        if let Some(channel) = self
            .subscribers
            .iter_mut()
            .find(|channel| channel.id() == subscriber)
        {
            channel.close();
            info!(subscriber = %subscriber, "subscriber detached");
        }
        self.prune();
    }

    /// Close subscribers that have been silent past the idle timeout.
    ///
    /// The stream is closed outright rather than suspended: a returning
    /// client re-subscribes and receives a fresh full snapshot, never a
    /// diff against a stale cursor.
    pub(crate) fn sweep_idle(&mut self, timeout: Duration) {
        let mut swept = 0_usize;
        for channel in &mut self.subscribers {
            if channel.idle_for() > timeout {
                channel.close();
                swept += 1;
            }
        }
        if swept > 0 {
            debug!(count = swept, "closed idle subscribers");
        }
        self.prune();
    }

    /// Propagate one successful poll cycle to all live subscribers.
    pub(crate) fn poll_cycle(
        &mut self,
        snapshot: &Snapshot,
        transfer: TransferSummary,
        history: Vec<spate_history::EraSeries>,
    ) {
        let next = torrent_document(snapshot);
        let ops = diff(&self.baseline, &next);
        if ops.is_empty() {
            debug!(revision = snapshot.revision(), "empty diff suppressed");
        } else {
            self.broadcast(Event::DiffUpdate { ops });
        }
        self.baseline = next;

        let taxonomy = snapshot.taxonomy();
        if self.last_taxonomy.as_ref() != Some(taxonomy) {
            self.last_taxonomy = Some(taxonomy.clone());
            self.broadcast(Event::Taxonomy(taxonomy.clone()));
        }

        if self.last_transfer != Some(transfer) {
            self.last_transfer = Some(transfer);
            self.broadcast(Event::TransferSummary(transfer));
            self.broadcast(Event::History { series: history });
        }
    }

    /// Emit a connectivity transition when reachability changes.
    pub(crate) fn connectivity(&mut self, connected: bool) {
        if self.last_connected != Some(connected) {
            self.last_connected = Some(connected);
            self.broadcast(Event::Connectivity { connected });
        }
    }

    /// Emit a notification-count change when the counter moves.
    pub(crate) fn notification_count(&mut self, count: u64) {
        if self.last_notifications != Some(count) {
            self.last_notifications = Some(count);
            self.broadcast(Event::NotificationCount { count });
        }
    }

    /// Close every subscriber (session teardown).
    pub(crate) fn close_all(&mut self) {
        for channel in &mut self.subscribers {
            channel.close();
        }
        self.subscribers.clear();
    }

    /// Number of currently registered subscribers.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn broadcast(&mut self, event: Event) {
        for channel in &mut self.subscribers {
            if channel.liveness() == Liveness::Streaming {
                channel.send(event.clone());
            }
        }
        self.prune();
    }

    fn prune(&mut self) {
        self.subscribers
            .retain(|channel| channel.liveness() != Liveness::Closed);
    }
}

/// Serialize the snapshot's torrent map into the diffable document.
pub(crate) fn torrent_document(snapshot: &Snapshot) -> JsonValue {
    serde_json::to_value(snapshot.torrents()).expect("torrent records serialize to JSON")
}
