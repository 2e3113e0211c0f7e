//! The gateway session actor.
//!
//! One task owns the snapshot store, the history eras, and the
//! subscriber registry. A recurring timer drives the poll-and-diff
//! cycle; because the cycle runs inline in the actor loop, a tick that
//! lands while a poll is outstanding is coalesced rather than queued.
//! The daemon serialises requests anyway, and overlapping polls would
//! race on the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use spate_config::{DaemonEndpoint, GatewayConfig};
use spate_core::{DaemonSettings, Snapshot, SnapshotStore, TransferSummary};
use spate_daemon::{DaemonAddr, DaemonClient, ScgiTransport, ThrottleDirection};
use spate_events::{FullUpdate, Subscription};
use spate_history::HistoryService;

use crate::command::{Reply, SessionCommand};
use crate::error::GatewayError;
use crate::stream::ActivityStream;

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Poll cadence against the daemon.
    pub poll_interval: Duration,
    /// Subscriber idle timeout.
    pub idle_timeout: Duration,
}

impl From<&GatewayConfig> for SessionOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Translate a configured endpoint into a transport address.
#[must_use]
pub fn daemon_addr(endpoint: &DaemonEndpoint) -> DaemonAddr {
    match endpoint {
        DaemonEndpoint::Tcp { host, port } => DaemonAddr::Tcp {
            host: host.clone(),
            port: *port,
        },
        DaemonEndpoint::Unix { path } => DaemonAddr::Unix { path: path.clone() },
    }
}

/// A running gateway session.
///
/// Owns the actor task; [`GatewaySession::shutdown`] tears down the poll
/// timer, the era timers, and every subscriber.
pub struct GatewaySession {
    handle: GatewayHandle,
    task: JoinHandle<()>,
}

impl GatewaySession {
    /// Spawn a session for the configured daemon endpoint.
    #[must_use]
    pub fn connect(config: &GatewayConfig) -> Self {
        let client = DaemonClient::new(ScgiTransport::shared(daemon_addr(&config.daemon)));
        Self::spawn(client, SessionOptions::from(config))
    }

    /// Spawn a session over an existing daemon client.
    #[must_use]
    pub fn spawn(client: DaemonClient, options: SessionOptions) -> Self {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let poll_interval = options.poll_interval;
        let task = tokio::spawn(run_session(client, options, receiver));
        info!(poll_interval_ms = poll_interval.as_millis() as u64, "gateway session started");
        Self {
            handle: GatewayHandle { commands: sender },
            task,
        }
    }

    /// Cloneable command façade for collaborators.
    #[must_use]
    pub fn handle(&self) -> GatewayHandle {
        self.handle.clone()
    }

    /// Stop the actor, closing all subscribers and timers.
    pub async fn shutdown(self) {
        let _ = self.handle.commands.send(SessionCommand::Shutdown).await;
        let _ = self.task.await;
        info!("gateway session stopped");
    }
}

/// Cloneable command surface accepted from collaborators.
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl GatewayHandle {
    /// Open a subscriber stream; the full state arrives first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionClosed`] when the session actor is
    /// gone.
    pub async fn subscribe(&self) -> Result<Subscription, GatewayError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::Subscribe { reply })
            .await
            .map_err(|_| GatewayError::SessionClosed)?;
        response.await.map_err(|_| GatewayError::SessionClosed)
    }

    /// Signal consumer liveness for a subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionClosed`] when the session actor is
    /// gone.
    pub async fn heartbeat(&self, subscriber: Uuid) -> Result<(), GatewayError> {
        self.commands
            .send(SessionCommand::Heartbeat { subscriber })
            .await
            .map_err(|_| GatewayError::SessionClosed)
    }

    /// Close a subscriber stream explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionClosed`] when the session actor is
    /// gone.
    pub async fn unsubscribe(&self, subscriber: Uuid) -> Result<(), GatewayError> {
        self.commands
            .send(SessionCommand::Unsubscribe { subscriber })
            .await
            .map_err(|_| GatewayError::SessionClosed)
    }

    /// Open and start torrents.
    ///
    /// # Errors
    ///
    /// Daemon faults propagate untouched; transport failures surface as
    /// [`GatewayError::Daemon`].
    pub async fn start_torrents(&self, hashes: Vec<String>) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::Start { hashes, reply })
            .await
    }

    /// Stop and close torrents.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn stop_torrents(&self, hashes: Vec<String>) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::Stop { hashes, reply })
            .await
    }

    /// Queue hash checks.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn check_torrents(&self, hashes: Vec<String>) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::Check { hashes, reply })
            .await
    }

    /// Set whole-torrent bandwidth priority.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn set_torrent_priority(
        &self,
        hashes: Vec<String>,
        priority: i64,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::SetTorrentPriority {
            hashes,
            priority,
            reply,
        })
        .await
    }

    /// Set per-file priority across torrents and file indices.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn set_file_priority(
        &self,
        hashes: Vec<String>,
        file_indices: Vec<i64>,
        priority: i64,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::SetFilePriority {
            hashes,
            file_indices,
            priority,
            reply,
        })
        .await
    }

    /// Replace tags on torrents.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn set_tags(
        &self,
        hashes: Vec<String>,
        tags: Vec<String>,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::SetTags {
            hashes,
            tags,
            reply,
        })
        .await
    }

    /// Attach tracker URIs to torrents.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn add_trackers(
        &self,
        hashes: Vec<String>,
        uris: Vec<String>,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::AddTrackers {
            hashes,
            uris,
            reply,
        })
        .await
    }

    /// Move torrent storage.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn move_torrents(
        &self,
        hashes: Vec<String>,
        destination: String,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::Move {
            hashes,
            destination,
            reply,
        })
        .await
    }

    /// Remove torrents, optionally deleting data.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn delete_torrents(
        &self,
        hashes: Vec<String>,
        with_data: bool,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::Delete {
            hashes,
            with_data,
            reply,
        })
        .await
    }

    /// Set a global throttle cap.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn set_throttle(
        &self,
        direction: ThrottleDirection,
        limit_bps: u64,
    ) -> Result<(), GatewayError> {
        self.request(|reply| SessionCommand::SetThrottle {
            direction,
            limit_bps,
            reply,
        })
        .await
    }

    /// Fetch daemon-wide settings.
    ///
    /// # Errors
    ///
    /// See [`GatewayHandle::start_torrents`].
    pub async fn fetch_settings(&self) -> Result<DaemonSettings, GatewayError> {
        self.request(|reply| SessionCommand::FetchSettings { reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, GatewayError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| GatewayError::SessionClosed)?;
        response.await.map_err(|_| GatewayError::SessionClosed)?
    }
}

async fn run_session(
    client: DaemonClient,
    options: SessionOptions,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let mut worker = SessionWorker::new(client, options.idle_timeout);
    let mut poll = tokio::time::interval(options.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => worker.handle(command).await,
                }
            }
            _ = poll.tick() => worker.run_poll_cycle().await,
        }
    }

    worker.teardown();
}

struct SessionWorker {
    client: DaemonClient,
    store: SnapshotStore,
    history: HistoryService,
    stream: ActivityStream,
    latest: Arc<Snapshot>,
    settings: DaemonSettings,
    settings_fetched: bool,
    transfer: TransferSummary,
    notifications: u64,
    idle_timeout: Duration,
}

impl SessionWorker {
    fn new(client: DaemonClient, idle_timeout: Duration) -> Self {
        let mut store = SnapshotStore::new();
        let latest = store.apply_poll(&[]).snapshot;
        Self {
            client,
            store,
            history: HistoryService::start(),
            stream: ActivityStream::new(),
            latest,
            settings: DaemonSettings::default(),
            settings_fetched: false,
            transfer: TransferSummary::default(),
            notifications: 0,
            idle_timeout,
        }
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Subscribe { reply } => {
                let subscription = self.stream.subscribe(self.full_update());
                let _ = reply.send(subscription);
            }
            SessionCommand::Heartbeat { subscriber } => self.stream.heartbeat(subscriber),
            SessionCommand::Unsubscribe { subscriber } => self.stream.unsubscribe(subscriber),
            SessionCommand::Start { hashes, reply } => {
                let result = self.client.start_torrents(&hashes).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::Stop { hashes, reply } => {
                let result = self.client.stop_torrents(&hashes).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::Check { hashes, reply } => {
                let result = self.client.check_torrents(&hashes).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::SetTorrentPriority {
                hashes,
                priority,
                reply,
            } => {
                let result = self.client.set_torrent_priority(&hashes, priority).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::SetFilePriority {
                hashes,
                file_indices,
                priority,
                reply,
            } => {
                let result = self
                    .client
                    .set_file_priority(&hashes, &file_indices, priority)
                    .await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::SetTags {
                hashes,
                tags,
                reply,
            } => {
                let result = self.client.set_tags(&hashes, &tags).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::AddTrackers {
                hashes,
                uris,
                reply,
            } => {
                let result = self.client.add_trackers(&hashes, &uris).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::Move {
                hashes,
                destination,
                reply,
            } => {
                let result = self.client.move_torrents(&hashes, &destination).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::Delete {
                hashes,
                with_data,
                reply,
            } => {
                let result = self.client.delete_torrents(&hashes, with_data).await;
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::SetThrottle {
                direction,
                limit_bps,
                reply,
            } => {
                let result = self.client.set_throttle(direction, limit_bps).await;
                if result.is_ok() {
                    // Reflect the new cap without waiting for the next poll.
                    match direction {
                        ThrottleDirection::Down => self.transfer.down_throttle = limit_bps,
                        ThrottleDirection::Up => self.transfer.up_throttle = limit_bps,
                    }
                }
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::FetchSettings { reply } => {
                let result = self.client.fetch_settings().await;
                if let Ok(settings) = &result {
                    self.settings = settings.clone();
                    self.settings_fetched = true;
                }
                let _ = reply.send(result.map_err(GatewayError::from));
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// One poll-and-diff cycle. A failed cycle logs, flags the daemon
    /// unreachable, and leaves the store and diff baseline untouched so
    /// the next successful poll diffs against the last good snapshot.
    async fn run_poll_cycle(&mut self) {
        let raws = match self.client.poll().await {
            Ok(raws) => raws,
            Err(err) => {
                warn!(error = %err, "poll cycle failed; retaining last good snapshot");
                self.stream.connectivity(false);
                return;
            }
        };
        let transfer = match self.client.fetch_transfer_summary().await {
            Ok(transfer) => transfer,
            Err(err) => {
                warn!(error = %err, "transfer summary fetch failed; cycle aborted");
                self.stream.connectivity(false);
                return;
            }
        };
        if !self.settings_fetched {
            match self.client.fetch_settings().await {
                Ok(settings) => {
                    self.settings = settings;
                    self.settings_fetched = true;
                }
                Err(err) => warn!(error = %err, "settings fetch failed; using defaults"),
            }
        }

        let outcome = self.store.apply_poll(&raws);
        self.latest = Arc::clone(&outcome.snapshot);
        self.transfer = transfer;

        self.history
            .record(rate_f64(transfer.up_rate), rate_f64(transfer.down_rate));

        self.stream.connectivity(true);
        self.stream
            .poll_cycle(&outcome.snapshot, transfer, self.history.series());

        if !outcome.finished.is_empty() {
            self.notifications += outcome.finished.len() as u64;
            info!(finished = ?outcome.finished, "torrents finished downloading");
        }
        self.stream.notification_count(self.notifications);

        self.stream.sweep_idle(self.idle_timeout);
    }

    fn full_update(&self) -> FullUpdate {
        FullUpdate {
            revision: self.latest.revision(),
            torrents: self.latest.torrents().clone(),
            settings: self.settings.clone(),
            transfer: self.transfer,
            history: self.history.series(),
            taxonomy: self.latest.taxonomy().clone(),
        }
    }

    fn teardown(&mut self) {
        self.stream.close_all();
        self.history.shutdown();
    }
}

fn rate_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "transfer rates are far below f64 precision limits"
    )]
    {
        value as f64
    }
}
