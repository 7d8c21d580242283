//! ipinfo.io lookup configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfoConfig {
    /// API token, sent as a bearer token
    pub token: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a successful lookup is reused
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_request_timeout_ms() -> u64 { 5_000 }
fn default_cache_ttl_secs() -> u64 { 24 * 60 * 60 }
fn default_base_url() -> String { "https://ipinfo.io".to_string() }

impl IpInfoConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            request_timeout_ms: default_request_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            base_url: default_base_url(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// Keeps the token out of logs.
impl fmt::Debug for IpInfoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpInfoConfig")
            .field("token", &"<redacted>")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}
