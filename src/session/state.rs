//! Session state machine values.
//!
//! # States
//! ```text
//! OPEN ──(error / malformed payload / shutdown)──▶ CLOSING ──(peer close / disconnect / deadline)──▶ CLOSED
//!   └──────────────(peer close / disconnect / transport error)──────────────────────────────────────▲
//! ```

use std::fmt;

use axum::extract::ws::{close_code, CloseFrame};

/// Lifecycle state of a connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake completed; timers armed, messages processed.
    Open,
    /// Termination started; timers cancelled, waiting for the close to finish.
    Closing,
    /// Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Open => "OPEN",
            SessionState::Closing => "CLOSING",
            SessionState::Closed => "CLOSED",
        })
    }
}

/// Code and reason recorded when a session reaches CLOSED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRecord {
    pub code: u16,
    pub reason: String,
}

impl CloseRecord {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Record a peer close frame. A frame without a status maps to 1005.
    pub fn from_frame(frame: Option<&CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self::new(frame.code, frame.reason.as_str()),
            None => Self::new(close_code::STATUS, ""),
        }
    }

    /// The connection ended without a close handshake (1006).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(close_code::ABNORMAL, reason)
    }
}
