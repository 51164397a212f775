//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Initialize subsystems in dependency order
//! - Bind the listener and serve until shutdown
//! - Wait a bounded time for live sessions to drain
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::validation::{validate_config, ValidationError};
use crate::config::ServerConfig;
use crate::http::WsServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::tls::{load_tls_config, TlsError};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("listener setup failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("server failed: {0}")]
    Server(#[from] std::io::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Run the server until SIGINT/SIGTERM, then drain.
pub async fn start(config: ServerConfig) -> Result<(), StartupError> {
    let (listener, tls) = prepare(&config).await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_watcher(shutdown.clone());
    serve(config, listener, tls, shutdown).await
}

/// Run the server until `shutdown` is triggered, then drain.
pub async fn run(config: ServerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let (listener, tls) = prepare(&config).await?;
    serve(config, listener, tls, shutdown).await
}

/// Validate, install metrics, load TLS material and bind, in that order.
async fn prepare(config: &ServerConfig) -> Result<(Listener, Option<RustlsConfig>), StartupError> {
    validate_config(config).map_err(StartupError::Config)?;

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let tls = match config.listener.tls.as_ref().filter(|_| config.listener.use_tls) {
        Some(tls) => Some(load_tls_config(tls).await?),
        None => None,
    };

    let listener = Listener::bind(&config.listener).await?;
    Ok((listener, tls))
}

/// Serve on an already bound listener until `shutdown` is triggered, then drain.
pub async fn serve(
    config: ServerConfig,
    listener: Listener,
    tls: Option<RustlsConfig>,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let grace = Duration::from_secs(config.observability.shutdown_grace_secs);
    let server = WsServer::new(config, shutdown);
    let tracker = server.tracker();

    server.run(listener, tls).await?;

    let remaining = tracker.active_count();
    if remaining > 0 {
        info!(active_sessions = remaining, grace_secs = grace.as_secs(), "Waiting for sessions to close");
    }
    if tracker.wait_for_drain(grace).await {
        info!("Shutdown complete");
    } else {
        warn!(active_sessions = tracker.active_count(), "Grace period elapsed with sessions still open");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_fails_before_binding() {
        let mut config = ServerConfig::default();
        config.listener.max_connections = 0;
        config.routing.expected_path = "no-slash".into();

        match run(config, Shutdown::new()).await {
            Err(StartupError::Config(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_tls_files_fail_startup() {
        let mut config = ServerConfig::default();
        config.listener.bind_host = "127.0.0.1".into();
        config.listener.port = 0;
        config.listener.use_tls = true;
        config.listener.tls = Some(crate::config::TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
        });

        assert!(matches!(
            run(config, Shutdown::new()).await,
            Err(StartupError::Tls(_))
        ));
    }

    #[tokio::test]
    async fn triggered_shutdown_returns_cleanly() {
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(run(loopback_config(), shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        assert!(handle.await.unwrap().is_ok());
    }

    fn loopback_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.listener.bind_host = "127.0.0.1".into();
        config.listener.port = 0;
        config
    }

    #[tokio::test]
    async fn shutdown_during_bind_is_not_lost() {
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(run(loopback_config(), shutdown.clone()));
        tokio::task::yield_now().await;
        shutdown.trigger();

        let finished = tokio::time::timeout(Duration::from_secs(3), handle).await;
        assert!(matches!(finished, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn shutdown_before_start_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let finished = tokio::time::timeout(Duration::from_secs(3), run(loopback_config(), shutdown)).await;
        assert!(matches!(finished, Ok(Ok(()))));
    }
}
