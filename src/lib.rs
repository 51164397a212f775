//! WebSocket gatekeeper server library.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client
//!       │  TCP (+ TLS)
//!       ▼
//!  ┌─────────┐    ┌──────────────┐    ┌─────────────┐    ┌──────────────────┐
//!  │   net   │───▶│     http     │───▶│   routing   │    │     session      │
//!  │listener │    │ server +     │◀───│ host + path │    │ one task per     │
//!  └─────────┘    │ gatekeeper   │    │ rule        │    │ connection:      │
//!                 └──────┬───────┘    └─────────────┘    │ push, heartbeat, │
//!                        │ admitted: 101 handshake       │ inbound, close   │
//!                        └──────────────────────────────▶└──────────────────┘
//!                        │ rejected: connection dropped, no response
//!
//!  Cross-cutting: config, observability (tracing + metrics), lifecycle
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::WsServer;
pub use lifecycle::Shutdown;
