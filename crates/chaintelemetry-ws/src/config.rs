//! Client configuration.

use std::time::Duration;

use chaintelemetry_core::DEFAULT_FEED_URL;
use serde::{Deserialize, Serialize};

/// Reconnect backoff: the delay before attempt `n` is
/// `min(base_delay_ms * 2^n, max_delay_ms)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 { 1_000 }
fn default_max_delay_ms() -> u64 { 10_000 }

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Feed endpoint, e.g. "wss://feed.telemetry.polkadot.io/feed/"
    #[serde(default = "default_url")]
    pub url: String,
    /// Reconnect automatically after the connection drops
    #[serde(default = "bool_true")]
    pub auto_reconnect: bool,
    /// Give up after this many consecutive failed reconnects
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_url() -> String { DEFAULT_FEED_URL.to_string() }
fn bool_true() -> bool { true }
fn default_max_reconnect_attempts() -> u32 { 5 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auto_reconnect: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
