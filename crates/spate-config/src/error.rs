//! Structured configuration errors.

use thiserror::Error;

/// Field-level validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {message}")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Human-readable error description.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(section: &str, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            section: section.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}
