//! Configuration loading from a JSON document and the environment.

use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{DaemonEndpoint, GatewayConfig};
use crate::validate::validate;

/// Environment variable naming the config document path.
pub const CONFIG_PATH_VAR: &str = "SPATE_CONFIG";

/// Load and validate a configuration document from disk.
///
/// # Errors
///
/// Returns an error when the file is unreadable, fails to parse, or
/// fails validation.
pub fn load_file(path: &Path) -> Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config document {}", path.display()))?;
    let mut config: GatewayConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config document {}", path.display()))?;
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Load configuration using `SPATE_CONFIG` for the document path,
/// falling back to environment-only configuration when unset.
///
/// # Errors
///
/// Returns an error when the referenced document is invalid, or when no
/// document is referenced and the environment does not describe a
/// daemon endpoint.
pub fn load_from_env() -> Result<GatewayConfig> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return load_file(Path::new(&path));
    }

    let host = std::env::var("SPATE_DAEMON_HOST").ok();
    let socket = std::env::var("SPATE_DAEMON_SOCKET").ok();
    let daemon = match (host, socket) {
        (_, Some(path)) => DaemonEndpoint::Unix { path: path.into() },
        (Some(host), None) => {
            let port = std::env::var("SPATE_DAEMON_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(5_000);
            DaemonEndpoint::Tcp { host, port }
        }
        (None, None) => anyhow::bail!(
            "no configuration: set {CONFIG_PATH_VAR}, SPATE_DAEMON_HOST, or SPATE_DAEMON_SOCKET"
        ),
    };

    let mut config = GatewayConfig {
        daemon,
        poll_interval_ms: crate::defaults::DEFAULT_POLL_INTERVAL_MS,
        idle_timeout_ms: crate::defaults::DEFAULT_IDLE_TIMEOUT_MS,
        logging: crate::model::LoggingSettings::default(),
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Some(interval) = env_u64("SPATE_POLL_INTERVAL_MS") {
        config.poll_interval_ms = interval;
    }
    if let Some(timeout) = env_u64("SPATE_IDLE_TIMEOUT_MS") {
        config.idle_timeout_ms = timeout;
    }
    if let Ok(level) = std::env::var("SPATE_LOG_LEVEL") {
        config.logging.level = level;
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_load_and_validate() {
        let dir = std::env::temp_dir().join("spate-config-loader-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("gateway.json");
        std::fs::write(
            &path,
            r#"{"daemon": {"type": "tcp", "host": "127.0.0.1", "port": 5000},
                "poll_interval_ms": 2000}"#,
        )
        .expect("write config");

        let config = load_file(&path).expect("load");
        assert_eq!(config.poll_interval_ms, 2_000);
        match config.daemon {
            DaemonEndpoint::Tcp { port, .. } => assert_eq!(port, 5_000),
            DaemonEndpoint::Unix { .. } => panic!("expected tcp endpoint"),
        }
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let dir = std::env::temp_dir().join("spate-config-loader-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("broken.json");
        std::fs::write(
            &path,
            r#"{"daemon": {"type": "tcp", "host": "", "port": 5000}}"#,
        )
        .expect("write config");
        assert!(load_file(&path).is_err());
    }
}
