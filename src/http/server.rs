//! Connection serving.
//!
//! # Responsibilities
//! - Accept TCP connections from the bounded listener
//! - Run the optional TLS handshake
//! - Drive HTTP/1.1 with upgrades on every connection
//! - Consult the gatekeeper before the request reaches the codec
//! - Stop accepting when shutdown is triggered
//!
//! # Design Decisions
//! - hyper is driven directly so a rejected request can abort the connection
//! - One task per connection; the session task outlives the HTTP driver
//! - Accept errors are transient: log, back off briefly, continue

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Request;
use axum::Router;
use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::gatekeeper::{Gatekeeper, UpgradeError};
use crate::http::websocket::{upgrade_router, ConnectionContext, UpgradeState};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::routing::RoutingRule;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A peer that has not finished the TLS handshake by then loses its slot.
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The WebSocket endpoint.
pub struct WsServer {
    gatekeeper: Arc<Gatekeeper>,
    app: Router,
    tracker: ConnectionTracker,
    shutdown: Shutdown,
}

impl WsServer {
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        let tracker = ConnectionTracker::new();
        let gatekeeper = Arc::new(Gatekeeper::new(RoutingRule::from_config(&config.routing)));
        let app = upgrade_router(UpgradeState {
            session: Arc::new(config.session),
            tracker: tracker.clone(),
            shutdown: shutdown.clone(),
        });

        Self {
            gatekeeper,
            app,
            tracker,
            shutdown,
        }
    }

    /// Live-session tracker, for draining after shutdown.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until shutdown is triggered.
    pub async fn run(self, listener: Listener, tls: Option<RustlsConfig>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        info!(
            address = %addr,
            tls = tls.is_some(),
            max_connections = listener.max_connections(),
            "WebSocket server listening"
        );

        let acceptor = tls.map(RustlsAcceptor::new);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            let (stream, peer, permit) = tokio::select! {
                biased;
                () = shutdown_rx.triggered() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            let ctx = ConnectionContext {
                id: ConnectionId::new(),
                peer,
                permit,
            };
            debug!(connection_id = %ctx.id, peer = %peer, "TCP connection accepted");

            let gatekeeper = Arc::clone(&self.gatekeeper);
            let app = self.app.clone();
            let shutdown = self.shutdown.clone();

            match acceptor.clone() {
                None => {
                    tokio::spawn(serve_connection(stream, ctx, gatekeeper, app, shutdown));
                }
                Some(acceptor) => {
                    tokio::spawn(async move {
                        match tls_handshake(acceptor.accept(stream, ()), TLS_HANDSHAKE_TIMEOUT).await {
                            Ok(tls_stream) => {
                                serve_connection(tls_stream, ctx, gatekeeper, app, shutdown).await
                            }
                            Err(e) => {
                                warn!(connection_id = %ctx.id, peer = %peer, error = %e, "TLS handshake failed");
                            }
                        }
                    });
                }
            }
        }

        info!(active_sessions = self.tracker.active_count(), "WebSocket server stopped accepting");
        Ok(())
    }
}

/// Drive one HTTP/1.1 connection. Returns once the connection closes or upgrades.
async fn serve_connection<I>(
    io: I,
    ctx: ConnectionContext,
    gatekeeper: Arc<Gatekeeper>,
    app: Router,
    shutdown: Shutdown,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = ctx.id;
    let service = service_fn(move |req: Request<Incoming>| {
        let gatekeeper = Arc::clone(&gatekeeper);
        let app = app.clone();
        let ctx = ctx.clone();
        async move { admit_and_route(req, ctx, &gatekeeper, app).await }
    });

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(io), service)
        .with_upgrades();
    tokio::pin!(conn);

    let mut shutdown_rx = shutdown.subscribe();
    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown_rx.triggered() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        debug!(connection_id = %id, error = %e, "Connection ended");
    }
}

async fn admit_and_route(
    mut req: Request<Incoming>,
    ctx: ConnectionContext,
    gatekeeper: &Gatekeeper,
    app: Router,
) -> Result<axum::response::Response, UpgradeError> {
    gatekeeper.admit(&req, ctx.peer)?;
    req.extensions_mut().insert(ctx);

    match app.oneshot(req).await {
        Ok(response) => Ok(response),
        Err(infallible) => match infallible {},
    }
}

/// Bound a TLS handshake so a stalled peer cannot hold a connection slot.
async fn tls_handshake<F, S>(handshake: F, limit: Duration) -> io::Result<S>
where
    F: Future<Output = io::Result<(S, ())>>,
{
    match tokio::time::timeout(limit, handshake).await {
        Ok(result) => result.map(|(stream, ())| stream),
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    #[tokio::test(start_paused = true)]
    async fn stalled_tls_handshake_times_out() {
        let started = tokio::time::Instant::now();
        let stalled = future::pending::<io::Result<((), ())>>();

        let err = tls_handshake(stalled, TLS_HANDSHAKE_TIMEOUT).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(started.elapsed(), TLS_HANDSHAKE_TIMEOUT);
    }

    #[tokio::test]
    async fn completed_tls_handshake_yields_stream() {
        let done = future::ready(Ok::<_, io::Error>((7u8, ())));
        assert_eq!(tls_handshake(done, TLS_HANDSHAKE_TIMEOUT).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn failed_tls_handshake_keeps_its_error() {
        let failed = future::ready(Err::<((), ()), _>(io::Error::new(
            io::ErrorKind::InvalidData,
            "bad record",
        )));
        let err = tls_handshake(failed, TLS_HANDSHAKE_TIMEOUT).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
