//! Error types for feed decoding and location lookups.

use thiserror::Error;

use crate::action::Action;

/// Errors that can occur while decoding a single feed frame.
///
/// None of these are fatal for a connection: the caller drops the frame
/// and carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame is not JSON, or not a two-element `[action, payload]` array.
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    /// The action code is outside the known action table.
    #[error("Unknown action code {code}")]
    UnknownAction { code: u64 },

    /// The action is known but its payload does not have the expected shape.
    #[error("Invalid {action} payload: {reason}")]
    InvalidPayload { action: Action, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the frame should be silently ignored rather than
    /// reported as a warning.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::UnknownAction { .. })
    }
}

/// A failed IP geolocation lookup.
#[derive(Debug, Clone, Error)]
#[error("Location lookup for {ip} failed: {reason}")]
pub struct LookupError {
    pub ip: String,
    pub reason: String,
}

impl LookupError {
    pub fn new(ip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            reason: reason.into(),
        }
    }
}
