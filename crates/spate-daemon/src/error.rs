//! Error types for the daemon client.

use thiserror::Error;

use spate_proto::{DaemonFault, ProtocolError};

/// Connection-level failure reaching the daemon.
///
/// The transport never retries; periodic polling is the retry mechanism.
#[derive(Debug, Error)]
#[error("daemon unreachable at {address}{}", port_suffix(.port))]
pub struct TransportError {
    /// Host name or socket path that was dialled.
    pub address: String,
    /// TCP port, when the endpoint is not a local socket.
    pub port: Option<u16>,
    /// Underlying I/O failure.
    #[source]
    pub source: std::io::Error,
}

fn port_suffix(port: &Option<u16>) -> String {
    port.map_or_else(String::new, |port| format!(":{port}"))
}

/// Any failure surfaced by a daemon call.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The daemon could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The response stream was malformed or truncated.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The daemon reported a method-level fault.
    #[error(transparent)]
    Fault(#[from] DaemonFault),
}
