//! Field-level validation for configuration documents.

use crate::error::ConfigError;
use crate::model::{DaemonEndpoint, GatewayConfig};

const KNOWN_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration document.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered, naming the offending
/// section and field.
pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    match &config.daemon {
        DaemonEndpoint::Tcp { host, port } => {
            if host.trim().is_empty() {
                return Err(ConfigError::invalid("daemon", "host", "must not be empty"));
            }
            if *port == 0 {
                return Err(ConfigError::invalid(
                    "daemon",
                    "port",
                    "must be between 1 and 65535",
                ));
            }
        }
        DaemonEndpoint::Unix { path } => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid("daemon", "path", "must not be empty"));
            }
        }
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::invalid(
            "gateway",
            "poll_interval_ms",
            "must be positive",
        ));
    }
    if config.idle_timeout_ms <= config.poll_interval_ms {
        return Err(ConfigError::invalid(
            "gateway",
            "idle_timeout_ms",
            "must exceed the poll interval",
        ));
    }

    if !KNOWN_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::invalid(
            "logging",
            "level",
            format!("unknown level '{}'", config.logging.level),
        ));
    }
    if let Some(format) = &config.logging.format
        && format != "json"
        && format != "pretty"
    {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            "must be 'json' or 'pretty'",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LoggingSettings;

    fn config() -> GatewayConfig {
        GatewayConfig {
            daemon: DaemonEndpoint::Tcp {
                host: "127.0.0.1".to_string(),
                port: 5_000,
            },
            poll_interval_ms: 5_000,
            idle_timeout_ms: 300_000,
            logging: LoggingSettings::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&config()).is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut invalid = config();
        invalid.daemon = DaemonEndpoint::Tcp {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let error = validate(&invalid).expect_err("invalid port");
        assert!(matches!(
            error,
            ConfigError::InvalidField { field, .. } if field == "port"
        ));
    }

    #[test]
    fn idle_timeout_must_exceed_poll_interval() {
        let mut invalid = config();
        invalid.idle_timeout_ms = invalid.poll_interval_ms;
        assert!(validate(&invalid).is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut invalid = config();
        invalid.logging.level = "loud".to_string();
        assert!(validate(&invalid).is_err());
    }
}
