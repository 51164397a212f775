//! WebSocket handshake completion.
//!
//! # Responsibilities
//! - Let the codec validate and answer an admitted upgrade request
//! - Apply the payload ceiling to the codec
//! - Spawn a `ConnectionSession` once the handshake completes
//!
//! # Data Flow
//! ```text
//! Admitted request ──▶ WebSocketUpgrade (101 or 4xx) ──▶ ConnectionSession::run
//! ```
//!
//! # Design Decisions
//! - Non-upgrade requests that pass the gatekeeper get the codec's 4xx answer
//! - The connection slot and live-session guard move into the session task

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::{Extension, Router};
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionId, ConnectionPermit, ConnectionTracker};
use crate::session::ConnectionSession;

/// Shared state for the upgrade handler.
#[derive(Clone)]
pub struct UpgradeState {
    pub session: Arc<SessionConfig>,
    pub tracker: ConnectionTracker,
    pub shutdown: Shutdown,
}

/// Per-connection facts attached to every admitted request.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub permit: ConnectionPermit,
}

/// Router that completes the handshake for any admitted path.
pub fn upgrade_router(state: UpgradeState) -> Router {
    Router::new().fallback(upgrade_handler).with_state(state)
}

async fn upgrade_handler(
    State(state): State<UpgradeState>,
    Extension(ctx): Extension<ConnectionContext>,
    ws: WebSocketUpgrade,
) -> Response {
    let limit = state.session.max_payload_bytes;
    let failed_id = ctx.id;

    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_failed_upgrade(move |e| {
            warn!(connection_id = %failed_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            let shutdown = state.shutdown.subscribe();
            let guard = state.tracker.track();
            let session = ConnectionSession::new(ctx.id, socket, ctx.peer, state.session)
                .with_shutdown(shutdown)
                .with_guard(guard)
                .with_permit(ctx.permit);

            let summary = session.run().await;
            info!(
                connection_id = %ctx.id,
                pushes_sent = summary.pushes_sent,
                pings_sent = summary.pings_sent,
                close_code = summary.close.code,
                "Session finished"
            );
        })
}
