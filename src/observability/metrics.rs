//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ws_upgrade_decisions_total` (counter): gatekeeper outcomes by `outcome`
//! - `ws_sessions_active` (gauge): live sessions
//! - `ws_sessions_closed_total` (counter): teardowns by close `code`
//! - `ws_push_messages_total` (counter): server push messages sent
//! - `ws_heartbeats_total` (counter): pings sent
//! - `ws_send_failures_total` (counter): failed sends by `timer`
//! - `ws_messages_received_total` (counter): inbound messages by `kind`
//!
//! Every recorder is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_upgrade_decision(outcome: &'static str) {
    counter!("ws_upgrade_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_session_opened() {
    gauge!("ws_sessions_active").increment(1.0);
}

pub fn record_session_ended() {
    gauge!("ws_sessions_active").decrement(1.0);
}

pub fn record_session_closed(code: u16) {
    counter!("ws_sessions_closed_total", "code" => code.to_string()).increment(1);
}

pub fn record_push_sent() {
    counter!("ws_push_messages_total").increment(1);
}

pub fn record_heartbeat_sent() {
    counter!("ws_heartbeats_total").increment(1);
}

pub fn record_send_failure(timer: &'static str) {
    counter!("ws_send_failures_total", "timer" => timer).increment(1);
}

pub fn record_message_received(kind: &'static str) {
    counter!("ws_messages_received_total", "kind" => kind).increment(1);
}
