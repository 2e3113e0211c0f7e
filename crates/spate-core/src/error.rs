//! Error types for the core domain.

use thiserror::Error;

/// Internal invariant violation.
///
/// This never surfaces to users; it signals a programming defect (for
/// example, aggregate recomputation diverging from the raw record set)
/// and is logged loudly at the point of detection.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("internal consistency violation: {detail}")]
pub struct ConsistencyError {
    /// Description of the violated invariant.
    pub detail: String,
}
