//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the WebSocket server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, port, TLS).
    pub listener: ListenerConfig,

    /// The single routing rule applied to every upgrade request.
    pub routing: RoutingConfig,

    /// Per-connection session behaviour.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port. 0 asks the OS for an ephemeral port.
    pub port: u16,

    /// Maximum concurrent transport connections (backpressure).
    pub max_connections: usize,

    /// Serve `wss://` instead of `ws://`.
    pub use_tls: bool,

    /// Certificate material, required when `use_tls` is set.
    pub tls: Option<TlsConfig>,
}

impl ListenerConfig {
    /// The `host:port` string handed to the socket layer.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') && !self.bind_host.starts_with('[') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
            use_tls: false,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Routing rule: which upgrade requests are promoted to WebSocket sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Host that must match together with `expected_path`.
    pub expected_host: String,

    /// Exact request path that must match together with `expected_host`.
    pub expected_path: String,

    /// Host accepted on any path, for local testing.
    pub loopback_host: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            expected_host: "example.com".to_string(),
            expected_path: "/myresource".to_string(),
            loopback_host: "localhost".to_string(),
        }
    }
}

/// Session timers, push stream and payload ceiling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between server pings, in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Interval between server push messages, in milliseconds.
    pub push_interval_ms: u64,

    /// Number of push messages sent before the push timer retires.
    pub push_limit: u32,

    /// Text sent on every push.
    pub push_payload: String,

    /// Largest inbound message or frame the codec will accept.
    pub max_payload_bytes: usize,

    /// How long a CLOSING session waits for the peer's close reply.
    pub close_timeout_ms: u64,
}

impl SessionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 10_000,
            push_interval_ms: 1_000,
            push_limit: 5,
            push_payload: "Hello from server!".to_string(),
            max_payload_bytes: 100 * 1024 * 1024, // 100 MiB
            close_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines for development.
    #[default]
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format of the fmt layer.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Seconds to wait for live sessions to close after shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            shutdown_grace_secs: 10,
        }
    }
}
