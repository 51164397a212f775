//! WebSocket session subsystem.
//!
//! # Data Flow
//! ```text
//! Completed upgrade (http/websocket.rs)
//!     → handler.rs (ConnectionSession, one task per connection)
//!         inbound frames ─┐
//!         heartbeat timer ├─▶ SessionEvent ─▶ dispatch ─▶ state.rs transition
//!         push timer      │
//!         shutdown signal ┘
//!     → payload.rs (validate inbound application data)
//!     → timer.rs (cancellable recurring timers)
//! ```
//!
//! # Design Decisions
//! - Events are applied one at a time; a session never races itself
//! - CLOSED is terminal and reached exactly once
//! - Sessions are fully independent of one another

pub mod handler;
pub mod payload;
pub mod state;
pub mod timer;

pub use handler::{Channel, ConnectionSession, SessionError, SessionEvent, SessionSummary};
pub use payload::{validate_payload, MalformedPayload, Payload, PayloadKind};
pub use state::{CloseRecord, SessionState};
pub use timer::RecurringTimer;
