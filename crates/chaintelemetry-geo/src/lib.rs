//! chaintelemetry-geo — IP geolocation for telemetry nodes.
//!
//! [`IpInfoClient`] implements [`LocationProvider`] against the ipinfo.io
//! API, caching successful lookups per IP for a configurable TTL.
//!
//! [`LocationProvider`]: chaintelemetry_core::LocationProvider

pub mod cache;
pub mod client;
pub mod config;

pub use cache::TtlCache;
pub use client::{parse_ipinfo, IpInfoClient, IpInfoResponse};
pub use config::IpInfoConfig;
