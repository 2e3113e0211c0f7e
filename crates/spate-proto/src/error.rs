//! Error taxonomy for the wire codec.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures detected while decoding a response stream.
///
/// A `ProtocolError` indicates a malformed or truncated wire response,
/// typically a daemon version mismatch or transport corruption. It aborts
/// the current exchange only; callers decide whether to surface or retry
/// on their own cadence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The decoder met a tag it does not recognise at this position.
    #[error("unexpected tag '{tag}' in response stream")]
    UnexpectedTag {
        /// Offending tag name as it appeared on the wire.
        tag: String,
    },

    /// The stream ended before the top-level document completed.
    #[error("response stream ended before the document completed")]
    Truncated,

    /// A scalar element carried text that does not parse as its type.
    #[error("invalid {kind} scalar '{text}'")]
    InvalidScalar {
        /// Scalar type that failed to parse (`int`, `boolean`, `double`).
        kind: &'static str,
        /// Raw text content of the element.
        text: String,
    },

    /// The response body is not valid UTF-8.
    #[error("response body is not valid UTF-8")]
    InvalidUtf8,

    /// A structurally complete document violated the protocol's shape.
    #[error("malformed {context} payload")]
    Malformed {
        /// Payload region that failed validation.
        context: &'static str,
    },
}

/// Method-level failure reported by the daemon itself.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("daemon fault {code}: {message}")]
pub struct DaemonFault {
    /// Numeric fault code from the daemon.
    pub code: i64,
    /// Human-readable fault description from the daemon.
    pub message: String,
}
