//! XML-RPC wire codec and SCGI request framing for the daemon gateway.
//!
//! # Design
//! - `value` carries the protocol's scalar/compound data model.
//! - `encode` renders method calls into request bodies.
//! - `decode` consumes response bodies with a per-call, SAX-style decoder
//!   (no module-level parser state, safe to run concurrently).
//! - `scgi` handles the stream transport's length-prefixed framing.

pub mod decode;
pub mod encode;
pub mod error;
pub mod scgi;
pub mod value;

pub use decode::{RpcResponse, decode_call, decode_response, fault_entry};
pub use encode::encode_call;
pub use error::{DaemonFault, ProtocolError};
pub use value::Value;
