//! Application bootstrap: configuration, telemetry, session lifecycle.

use anyhow::Result;
use tracing::{debug, info};

use spate_config::load_from_env;
use spate_gateway::GatewaySession;
use spate_telemetry::{LogFormat, LoggingConfig, init_logging};

/// Run the gateway until a shutdown signal arrives.
///
/// Loads configuration from `SPATE_CONFIG`/environment, installs the
/// tracing subscriber, spawns the session for the configured daemon,
/// and attaches a logging observer so gateway events are visible even
/// without a delivery surface on top.
///
/// # Errors
///
/// Returns an error when configuration is invalid, telemetry cannot be
/// installed, or the initial subscription fails.
pub async fn run_app() -> Result<()> {
    let config = load_from_env()?;
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_name(config.logging.format.as_deref()),
        build_sha: option_env!("SPATE_BUILD_SHA").unwrap_or("dev"),
    })?;
    info!(daemon = ?config.daemon, poll_interval_ms = config.poll_interval_ms, "starting gateway session");

    let session = GatewaySession::connect(&config);
    let handle = session.handle();
    let mut subscription = handle.subscribe().await?;

    let observer = tokio::spawn(async move {
        while let Some(envelope) = subscription.next().await {
            debug!(
                kind = envelope.event.kind(),
                id = envelope.id,
                "gateway event"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    session.shutdown().await;
    observer.await.ok();
    Ok(())
}
