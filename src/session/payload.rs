//! Inbound application payload validation.
//!
//! Every payload is logged as text, so binary frames must decode as UTF-8.
//! Anything else is a malformed payload and ends the session with a
//! protocol-error close.

use axum::extract::ws::Message;
use thiserror::Error;

/// Why an inbound message was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPayload {
    #[error("binary payload is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("control frame is not an application message")]
    NotApplicationData,
}

/// Frame kind of an application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Binary,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Binary => "binary",
        }
    }
}

/// A validated application message, viewed as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload<'a> {
    pub kind: PayloadKind,
    pub text: &'a str,
}

impl<'a> Payload<'a> {
    /// At most `max_chars` characters of the text.
    pub fn preview(&self, max_chars: usize) -> &'a str {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => &self.text[..end],
            None => self.text,
        }
    }
}

pub fn validate_payload(message: &Message) -> Result<Payload<'_>, MalformedPayload> {
    match message {
        Message::Text(text) => Ok(Payload {
            kind: PayloadKind::Text,
            text: text.as_str(),
        }),
        Message::Binary(bytes) => std::str::from_utf8(bytes)
            .map(|text| Payload {
                kind: PayloadKind::Binary,
                text,
            })
            .map_err(|e| MalformedPayload::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            }),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => {
            Err(MalformedPayload::NotApplicationData)
        }
    }
}
