//! Per-connection session: event dispatch, timers and teardown.
//!
//! # Responsibilities
//! - Own the channel, both recurring timers and the push counter
//! - Turn inbound frames, timer fires and shutdown into `SessionEvent`s
//! - Apply each event to completion before taking the next one
//! - Tear down exactly once, whatever triggers it first
//!
//! # Design Decisions
//! - One task per session; state is never shared, so no locks
//! - Send failures cancel the timer that caused them and stay local
//! - Timers are cancelled before the channel is released

use std::future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::time::{self, Sleep};
use tracing::{debug, info, warn, Instrument};

use crate::config::SessionConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::canonical_ip;
use crate::net::{ConnectionGuard, ConnectionId, ConnectionPermit};
use crate::observability::metrics;
use crate::session::payload::{validate_payload, MalformedPayload};
use crate::session::state::{CloseRecord, SessionState};
use crate::session::timer::RecurringTimer;

/// Characters of an inbound payload echoed at debug level.
const PREVIEW_CHARS: usize = 128;

/// The logical WebSocket channel a session drives.
pub trait Channel:
    Stream<Item = Result<Message, axum::Error>> + Sink<Message, Error = axum::Error> + Unpin + Send
{
}

impl<T> Channel for T where
    T: Stream<Item = Result<Message, axum::Error>>
        + Sink<Message, Error = axum::Error>
        + Unpin
        + Send
{
}

/// Errors raised inside a session. They never leave the session task.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("channel is {0}, not OPEN")]
    NotOpen(SessionState),

    #[error("send failed: {0}")]
    Send(#[source] axum::Error),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] MalformedPayload),
}

/// Everything that can drive a session transition.
#[derive(Debug)]
pub enum SessionEvent {
    /// Text or binary application message.
    Message(Message),
    Ping(Bytes),
    Pong(Bytes),
    /// Peer close frame, if it carried one.
    Close(Option<CloseFrame>),
    /// The codec reported a transport fault.
    Error(axum::Error),
    /// The stream ended without a close frame.
    Disconnected,
    HeartbeatDue,
    PushDue,
    /// Process shutdown was requested.
    Shutdown,
    /// The peer did not finish the close handshake in time.
    CloseTimeout,
}

impl SessionEvent {
    fn from_inbound(inbound: Option<Result<Message, axum::Error>>) -> Self {
        match inbound {
            Some(Ok(Message::Ping(payload))) => SessionEvent::Ping(payload),
            Some(Ok(Message::Pong(payload))) => SessionEvent::Pong(payload),
            Some(Ok(Message::Close(frame))) => SessionEvent::Close(frame),
            Some(Ok(message)) => SessionEvent::Message(message),
            Some(Err(e)) => SessionEvent::Error(e),
            None => SessionEvent::Disconnected,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub pushes_sent: u32,
    pub pings_sent: u64,
    pub close: CloseRecord,
}

/// A single WebSocket session bound to one channel.
pub struct ConnectionSession<C> {
    id: ConnectionId,
    channel: C,
    remote_addr: IpAddr,
    state: SessionState,
    push_count: u32,
    pings_sent: u64,
    heartbeat: RecurringTimer,
    push: RecurringTimer,
    closing_deadline: Option<Pin<Box<Sleep>>>,
    shutdown: Option<ShutdownSignal>,
    close_record: Option<CloseRecord>,
    config: Arc<SessionConfig>,
    _guard: Option<ConnectionGuard>,
    _permit: Option<ConnectionPermit>,
}

impl<C: Channel> ConnectionSession<C> {
    /// Create an OPEN session and arm both timers.
    pub fn new(id: ConnectionId, channel: C, peer: SocketAddr, config: Arc<SessionConfig>) -> Self {
        Self {
            id,
            channel,
            remote_addr: canonical_ip(peer),
            state: SessionState::Open,
            push_count: 0,
            pings_sent: 0,
            heartbeat: RecurringTimer::armed("heartbeat", config.heartbeat_interval()),
            push: RecurringTimer::armed("push", config.push_interval()),
            closing_deadline: None,
            shutdown: None,
            close_record: None,
            config,
            _guard: None,
            _permit: None,
        }
    }

    /// Close with 1001 when the process shuts down.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Hold a live-session guard until the session ends.
    pub fn with_guard(mut self, guard: ConnectionGuard) -> Self {
        self._guard = Some(guard);
        self
    }

    /// Hold the listener's connection slot until the session ends.
    pub fn with_permit(mut self, permit: ConnectionPermit) -> Self {
        self._permit = Some(permit);
        self
    }

    pub fn remote_addr(&self) -> IpAddr {
        self.remote_addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn push_count(&self) -> u32 {
        self.push_count
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }

    pub fn heartbeat_armed(&self) -> bool {
        self.heartbeat.is_armed()
    }

    pub fn push_armed(&self) -> bool {
        self.push.is_armed()
    }

    pub fn close_record(&self) -> Option<&CloseRecord> {
        self.close_record.as_ref()
    }

    /// Drive the session until it reaches CLOSED, then release the channel.
    pub async fn run(mut self) -> SessionSummary {
        let span = tracing::info_span!(
            "session",
            connection_id = %self.id,
            remote_addr = %self.remote_addr,
        );

        async move {
            info!("Connection accepted");
            while self.state != SessionState::Closed {
                let event = self.next_event().await;
                self.dispatch(event).await;
            }
            self.release().await
        }
        .instrument(span)
        .await
    }

    async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            inbound = self.channel.next() => SessionEvent::from_inbound(inbound),
            () = self.heartbeat.tick() => SessionEvent::HeartbeatDue,
            () = self.push.tick() => SessionEvent::PushDue,
            () = shutdown_requested(&mut self.shutdown) => SessionEvent::Shutdown,
            () = closing_deadline(&mut self.closing_deadline) => SessionEvent::CloseTimeout,
        }
    }

    /// Apply one event. The only place session state changes.
    pub async fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Message(message) => self.on_message(message).await,
            SessionEvent::Ping(payload) => self.on_control("ping", &payload),
            SessionEvent::Pong(payload) => self.on_control("pong", &payload),
            SessionEvent::Close(frame) => {
                let record = CloseRecord::from_frame(frame.as_ref());
                info!(code = record.code, reason = %record.reason, "Peer closed connection");
                self.teardown(record);
            }
            SessionEvent::Error(error) => {
                warn!(error = %error, "Transport error");
                self.enter_closing();
                self.teardown(CloseRecord::abnormal(format!("transport error: {error}")));
            }
            SessionEvent::Disconnected => {
                self.teardown(CloseRecord::abnormal("peer disconnected"));
            }
            SessionEvent::HeartbeatDue => self.on_heartbeat().await,
            SessionEvent::PushDue => self.on_push().await,
            SessionEvent::Shutdown => {
                self.begin_close(close_code::AWAY, "server shutting down").await;
            }
            SessionEvent::CloseTimeout => {
                if self.state == SessionState::Closing {
                    warn!("Peer did not complete close handshake");
                    self.teardown(CloseRecord::abnormal("close handshake timed out"));
                }
            }
        }
    }

    async fn on_message(&mut self, message: Message) {
        if self.state != SessionState::Open {
            debug!(state = %self.state, "Ignoring message outside OPEN");
            return;
        }

        match validate_payload(&message) {
            Ok(payload) => {
                metrics::record_message_received(payload.kind.as_str());
                info!(kind = payload.kind.as_str(), len = payload.text.len(), "Message received");
                debug!(preview = payload.preview(PREVIEW_CHARS), "Message payload");
            }
            Err(e) => {
                let error = SessionError::from(e);
                warn!(error = %error, "Closing session");
                self.begin_close(close_code::PROTOCOL, "malformed payload").await;
            }
        }
    }

    /// Pings are answered by the codec; pongs are only observed.
    fn on_control(&mut self, kind: &'static str, payload: &Bytes) {
        if self.state != SessionState::Open {
            return;
        }
        metrics::record_message_received(kind);
        debug!(kind, len = payload.len(), payload = ?payload, "Control frame received");
    }

    async fn on_heartbeat(&mut self) {
        if self.state != SessionState::Open {
            self.heartbeat.cancel();
            return;
        }

        match self.send(Message::Ping(Bytes::new())).await {
            Ok(()) => {
                self.pings_sent += 1;
                metrics::record_heartbeat_sent();
                debug!(pings_sent = self.pings_sent, "Heartbeat sent");
            }
            Err(e) => {
                warn!(error = %e, "Heartbeat failed, cancelling heartbeat timer");
                metrics::record_send_failure(self.heartbeat.name());
                self.heartbeat.cancel();
            }
        }
    }

    async fn on_push(&mut self) {
        if self.state != SessionState::Open {
            self.push.cancel();
            return;
        }
        if self.push_count >= self.config.push_limit {
            self.retire_push();
            return;
        }

        let message = Message::Text(self.config.push_payload.clone().into());
        match self.send(message).await {
            Ok(()) => {
                self.push_count += 1;
                metrics::record_push_sent();
                debug!(push_count = self.push_count, "Push message sent");
                if self.push_count >= self.config.push_limit {
                    self.retire_push();
                }
            }
            Err(e) => {
                warn!(error = %e, "Push failed, cancelling push timer");
                metrics::record_send_failure(self.push.name());
                self.push.cancel();
            }
        }
    }

    fn retire_push(&mut self) {
        if self.push.cancel() {
            info!(push_count = self.push_count, "Push limit reached");
        }
    }

    /// Send an application or control frame; refused unless OPEN.
    async fn send(&mut self, message: Message) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            return Err(SessionError::NotOpen(self.state));
        }
        self.channel.send(message).await.map_err(SessionError::Send)
    }

    fn enter_closing(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closing;
            self.heartbeat.cancel();
            self.push.cancel();
        }
    }

    /// Start a local close: OPEN → CLOSING, send the close frame, arm the deadline.
    async fn begin_close(&mut self, code: u16, reason: &str) {
        if self.state != SessionState::Open {
            debug!(state = %self.state, "Close already in progress");
            return;
        }
        self.enter_closing();

        let frame = CloseFrame {
            code,
            reason: reason.to_owned().into(),
        };
        match self.channel.send(Message::Close(Some(frame))).await {
            Ok(()) => {
                info!(code, reason, "Close initiated");
                self.closing_deadline = Some(Box::pin(time::sleep(self.config.close_timeout())));
            }
            Err(e) => {
                warn!(error = %e, "Failed to send close frame");
                self.teardown(CloseRecord::abnormal("close frame could not be sent"));
            }
        }
    }

    /// Enter CLOSED. Later triggers are ignored.
    fn teardown(&mut self, record: CloseRecord) {
        if self.state == SessionState::Closed {
            debug!(code = record.code, "Session already closed, ignoring termination");
            return;
        }

        self.heartbeat.cancel();
        self.push.cancel();
        self.closing_deadline = None;
        self.state = SessionState::Closed;

        metrics::record_session_closed(record.code);
        info!(
            code = record.code,
            reason = %record.reason,
            pushes_sent = self.push_count,
            pings_sent = self.pings_sent,
            "Session closed"
        );
        self.close_record = Some(record);
    }

    async fn release(mut self) -> SessionSummary {
        // Flushes a queued close reply before the transport is dropped.
        match time::timeout(self.config.close_timeout(), self.channel.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Channel close reported an error"),
            Err(_) => debug!("Channel close timed out"),
        }

        SessionSummary {
            pushes_sent: self.push_count,
            pings_sent: self.pings_sent,
            close: self
                .close_record
                .take()
                .unwrap_or_else(|| CloseRecord::abnormal("session ended")),
        }
    }
}

/// Fires once; the signal is latched, so it is dropped after firing.
async fn shutdown_requested(shutdown: &mut Option<ShutdownSignal>) {
    match shutdown.as_mut() {
        Some(signal) => {
            signal.triggered().await;
            *shutdown = None;
        }
        None => future::pending().await,
    }
}

async fn closing_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
