//! Gateway-level error taxonomy.

use thiserror::Error;

use spate_daemon::DaemonError;

/// Failures surfaced to gateway collaborators.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A daemon call failed (transport, protocol, or daemon fault).
    #[error(transparent)]
    Daemon(#[from] DaemonError),
    /// The session actor is no longer running.
    #[error("gateway session closed")]
    SessionClosed,
}
