//! Errors surfaced by the telemetry client.

use thiserror::Error;

/// Client-level failures.
///
/// `Clone` so the same error can go to the `connect()` caller, the logger
/// and every `errors()` receiver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("Feed version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u64, got: u64 },

    #[error("Failed to reconnect to {url} after {attempts} attempts")]
    ReconnectExhausted { url: String, attempts: u32 },

    #[error("Connection to {url} closed")]
    ConnectionClosed { url: String },

    #[error("Connection to {url} cancelled by disconnect()")]
    Cancelled { url: String },
}

impl ClientError {
    /// Fatal errors end the connection for good; the client stays
    /// disconnected until `connect()` is called again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. } | Self::ReconnectExhausted { .. }
        )
    }

    pub(crate) fn connection(url: &str, reason: impl ToString) -> Self {
        Self::Connection {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
