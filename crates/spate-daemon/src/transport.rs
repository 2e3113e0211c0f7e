//! Per-call stream transport.
//!
//! One connection is opened per call (no pooling): the daemon serialises
//! requests anyway, and a fresh stream per exchange keeps failure
//! handling trivial. Retry and backoff policy belongs to the poller, not
//! here.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tracing::trace;

use spate_proto::{RpcResponse, Value, decode_response, encode_call, scgi};

use crate::error::{DaemonError, TransportError};

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonAddr {
    /// TCP endpoint.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Local socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: PathBuf,
    },
}

impl fmt::Display for DaemonAddr {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(formatter, "{host}:{port}"),
            Self::Unix { path } => write!(formatter, "{}", path.display()),
        }
    }
}

/// Seam between the daemon client and the wire.
///
/// Production code uses [`ScgiTransport`]; tests substitute scripted
/// stand-ins.
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    /// Issue one remote call and decode its response value.
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, DaemonError>;
}

/// Stream transport speaking SCGI-framed calls to the daemon.
#[derive(Debug, Clone)]
pub struct ScgiTransport {
    addr: DaemonAddr,
}

impl ScgiTransport {
    /// Build a transport for the given endpoint.
    #[must_use]
    pub fn new(addr: DaemonAddr) -> Self {
        Self { addr }
    }

    /// Convenience constructor returning the trait object form used by
    /// the client.
    #[must_use]
    pub fn shared(addr: DaemonAddr) -> Arc<dyn DaemonTransport> {
        Arc::new(Self::new(addr))
    }

    fn transport_error(&self, source: std::io::Error) -> TransportError {
        match &self.addr {
            DaemonAddr::Tcp { host, port } => TransportError {
                address: host.clone(),
                port: Some(*port),
                source,
            },
            DaemonAddr::Unix { path } => TransportError {
                address: path.display().to_string(),
                port: None,
                source,
            },
        }
    }

    async fn exchange(&self, payload: &[u8]) -> std::io::Result<Vec<u8>> {
        match &self.addr {
            DaemonAddr::Tcp { host, port } => {
                let mut stream = TcpStream::connect((host.as_str(), *port)).await?;
                write_and_collect(&mut stream, payload).await
            }
            DaemonAddr::Unix { path } => {
                #[cfg(unix)]
                {
                    let mut stream = UnixStream::connect(path).await?;
                    write_and_collect(&mut stream, payload).await
                }
                #[cfg(not(unix))]
                {
                    let _ = path;
                    Err(std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "local socket transport requires a unix platform",
                    ))
                }
            }
        }
    }
}

async fn write_and_collect<S>(stream: &mut S, payload: &[u8]) -> std::io::Result<Vec<u8>>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    stream.write_all(payload).await?;
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

#[async_trait]
impl DaemonTransport for ScgiTransport {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, DaemonError> {
        let body = encode_call(method, params);
        let framed = scgi::frame_request(&body);
        trace!(method, endpoint = %self.addr, bytes = framed.len(), "issuing daemon call");

        let raw = self
            .exchange(&framed)
            .await
            .map_err(|source| self.transport_error(source))?;

        match decode_response(scgi::response_body(&raw))? {
            RpcResponse::Success(value) => Ok(value),
            RpcResponse::Fault(fault) => Err(DaemonError::Fault(fault)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_refused_maps_to_transport_error() {
        // Port 1 on localhost is essentially guaranteed to refuse.
        let transport = ScgiTransport::new(DaemonAddr::Tcp {
            host: "127.0.0.1".to_string(),
            port: 1,
        });
        let error = transport
            .call("system.listMethods", &[])
            .await
            .expect_err("connect must fail");
        match error {
            DaemonError::Transport(transport_error) => {
                assert_eq!(transport_error.address, "127.0.0.1");
                assert_eq!(transport_error.port, Some(1));
            }
            other => panic!("expected transport error, got {other}"),
        }
    }

    #[tokio::test]
    async fn tcp_round_trip_against_a_scripted_listener() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            socket.read_to_end(&mut request).await.expect("read");
            let reply = "Content-Type: text/xml\r\n\r\n<?xml version=\"1.0\"?>\
                <methodResponse><params><param><value><i8>7</i8></value></param></params></methodResponse>";
            socket.write_all(reply.as_bytes()).await.expect("write");
            request
        });

        let transport = ScgiTransport::new(DaemonAddr::Tcp {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
        });
        let value = transport
            .call("throttle.global_down.rate", &[])
            .await
            .expect("call succeeds");
        assert_eq!(value, Value::Int(7));

        let request = server.await.expect("server task");
        let text = String::from_utf8_lossy(&request);
        assert!(text.contains("CONTENT_LENGTH"));
        assert!(text.contains("throttle.global_down.rate"));
    }
}
