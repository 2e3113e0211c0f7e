//! Command protocol between [`crate::GatewayHandle`] and the session
//! actor.

use tokio::sync::oneshot;
use uuid::Uuid;

use spate_core::DaemonSettings;
use spate_daemon::ThrottleDirection;
use spate_events::Subscription;

use crate::error::GatewayError;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, GatewayError>>;

/// Inbound commands accepted from collaborators.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Heartbeat {
        subscriber: Uuid,
    },
    Unsubscribe {
        subscriber: Uuid,
    },
    Start {
        hashes: Vec<String>,
        reply: Reply<()>,
    },
    Stop {
        hashes: Vec<String>,
        reply: Reply<()>,
    },
    Check {
        hashes: Vec<String>,
        reply: Reply<()>,
    },
    SetTorrentPriority {
        hashes: Vec<String>,
        priority: i64,
        reply: Reply<()>,
    },
    SetFilePriority {
        hashes: Vec<String>,
        file_indices: Vec<i64>,
        priority: i64,
        reply: Reply<()>,
    },
    SetTags {
        hashes: Vec<String>,
        tags: Vec<String>,
        reply: Reply<()>,
    },
    AddTrackers {
        hashes: Vec<String>,
        uris: Vec<String>,
        reply: Reply<()>,
    },
    Move {
        hashes: Vec<String>,
        destination: String,
        reply: Reply<()>,
    },
    Delete {
        hashes: Vec<String>,
        with_data: bool,
        reply: Reply<()>,
    },
    SetThrottle {
        direction: ThrottleDirection,
        limit_bps: u64,
        reply: Reply<()>,
    },
    FetchSettings {
        reply: Reply<DaemonSettings>,
    },
    Shutdown,
}
