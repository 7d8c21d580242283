//! Tracks the chain the client wants to follow.
//!
//! The feed streams one chain per connection, so at most one genesis hash
//! is tracked. It is re-sent every time the connection (re)opens.

use std::sync::Arc;

use chaintelemetry_core::GenesisHash;
use parking_lot::Mutex;

/// Shared, cloneable handle to the desired subscription.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTracker {
    chain: Arc<Mutex<Option<GenesisHash>>>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `chain`, replacing any previous one.
    pub fn set(&self, chain: impl Into<GenesisHash>) {
        *self.chain.lock() = Some(chain.into());
    }

    pub fn current(&self) -> Option<GenesisHash> {
        self.chain.lock().clone()
    }

    pub fn clear(&self) {
        *self.chain.lock() = None;
    }

    /// The frame to send for the tracked chain, if any.
    pub fn subscribe_frame(&self) -> Option<String> {
        self.current().map(|chain| subscribe_frame(&chain))
    }
}

/// `subscribe:<genesisHash>`
pub fn subscribe_frame(chain: &str) -> String {
    format!("subscribe:{chain}")
}
