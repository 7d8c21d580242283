//! chaintelemetry-core — feed decoding and node state for ChainTelemetry.
//!
//! # Overview
//!
//! A Substrate telemetry feed streams compact `[action, payload]` frames
//! describing the nodes of a network. This crate turns those frames into
//! typed events and folds them into per-node state:
//!
//! - [`FeedDecoder`] — raw text frame → [`FeedMessage`]
//! - [`NodeRegistry`] — node id → [`NodeRecord`], with field-level merge rules
//! - [`ChainStatsStore`] — latest chain-wide [`ChainStats`] snapshot
//! - [`LocationProvider`] — seam for optional IP geolocation enrichment
//! - [`chains`] — well-known genesis hashes and feed constants

pub mod action;
pub mod chains;
pub mod decoder;
pub mod error;
pub mod location;
pub mod message;
pub mod node;
pub mod registry;
pub mod stats;

pub use action::Action;
pub use chains::{GenesisHash, DEFAULT_FEED_URL, FEED_VERSION};
pub use decoder::FeedDecoder;
pub use error::{DecodeError, LookupError};
pub use location::LocationProvider;
pub use message::{AddedNode, BlockDetails, FeedMessage, NodeDetails, NodeStats};
pub use node::{
    BenchmarkScore, Benchmarks, BlockInfo, Location, NetworkInfo, NodeHardware, NodeId, NodeIo,
    NodeRecord, SystemInfo,
};
pub use registry::{ApplyOutcome, NodeRegistry};
pub use stats::{ChainStats, ChainStatsStore, RangeBucket, Ranking};
