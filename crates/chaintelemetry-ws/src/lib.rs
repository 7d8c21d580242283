//! chaintelemetry-ws — WebSocket telemetry feed client with auto-reconnect.
//!
//! # Features
//! - Background connection task that owns the socket and the node registry
//! - Auto-reconnect on disconnect (capped exponential backoff)
//! - Single-chain subscription, re-sent after every reconnect
//! - Ordered update observers with unsubscribe handles
//! - Optional IP geolocation enrichment through a `LocationProvider`

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod notifier;
pub mod state;
pub mod subscription;

pub use backoff::ReconnectPolicy;
pub use client::TelemetryClient;
pub use config::{BackoffConfig, ClientConfig};
pub use error::ClientError;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use notifier::{ObserverHandle, UpdateNotifier};
pub use state::{CloseDecision, ConnectionMachine, ConnectionState};
pub use subscription::SubscriptionTracker;
