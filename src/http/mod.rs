//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (hyper HTTP/1.1 with upgrades)
//!     → gatekeeper.rs (routing rule: admit or abort)
//!     → websocket.rs (handshake via the codec, spawn session)
//!     → session subsystem
//! ```

pub mod gatekeeper;
pub mod server;
pub mod websocket;

pub use gatekeeper::{Gatekeeper, UpgradeError};
pub use server::WsServer;
pub use websocket::{ConnectionContext, UpgradeState};
