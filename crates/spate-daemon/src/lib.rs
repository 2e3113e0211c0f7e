//! Daemon client: stream transport, multicall batching, and the typed
//! command surface.
//!
//! Layout: `transport.rs` (per-call stream connections and the
//! `DaemonTransport` seam), `multicall.rs` (request batching and
//! response mapping), `commands.rs` (typed operations translated into
//! batched calls).

pub mod commands;
pub mod error;
pub mod multicall;
pub mod transport;

pub use commands::{DaemonClient, ThrottleDirection};
pub use error::{DaemonError, TransportError};
pub use multicall::{MulticallOutcome, MulticallRequest, batch, expand, map_indexed_rows, map_keyed};
pub use transport::{DaemonAddr, DaemonTransport, ScgiTransport};
