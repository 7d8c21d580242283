//! Per-node state held by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned node identifier, valid for the lifetime of the node's
/// connection to the feed.
pub type NodeId = u64;

/// Everything known about one node.
///
/// Identity fields and [`SystemInfo`] are fixed when the node is added; the
/// remaining sections are merged by update events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub implementation: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    pub network: NetworkInfo,
    pub system: SystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockInfo>,
    pub transaction_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io: Option<NodeIo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<NodeHardware>,
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub peer_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    /// Raw IP, only present when the feed exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub cpu: String,
    /// Total memory in bytes.
    pub memory: u64,
    pub core_count: u32,
    pub is_virtual_machine: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmarks: Option<Benchmarks>,
}

/// Hardware benchmark results reported by the node (`hwbench`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Benchmarks {
    pub cpu_hashrate_score: Option<BenchmarkScore>,
    pub memory_memcpy_score: Option<BenchmarkScore>,
    pub disk_sequential_write_score: Option<BenchmarkScore>,
    pub disk_random_write_score: Option<BenchmarkScore>,
    pub cpu_vendor: Option<String>,
}

/// A benchmark score with an optional upper bound.
///
/// `max: None` means the feed reported no maximum, which is distinct from a
/// maximum of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScoreRepr")]
pub struct BenchmarkScore {
    pub value: u64,
    pub max: Option<u64>,
}

/// Wire shapes seen for scores: `v`, `[v]`, `[v, null]`, `[v, max]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreRepr {
    Bare(u64),
    Seq(Vec<Option<u64>>),
}

impl TryFrom<ScoreRepr> for BenchmarkScore {
    type Error = String;

    fn try_from(repr: ScoreRepr) -> Result<Self, Self::Error> {
        match repr {
            ScoreRepr::Bare(value) => Ok(Self { value, max: None }),
            ScoreRepr::Seq(items) => match items.as_slice() {
                [Some(value)] => Ok(Self {
                    value: *value,
                    max: None,
                }),
                [Some(value), max] => Ok(Self {
                    value: *value,
                    max: *max,
                }),
                _ => Err(format!("expected [value, max?], got {items:?}")),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Network operator, filled in by geolocation enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Location {
    /// Overlay every field that `other` sets; fields it leaves empty keep
    /// their current value.
    pub fn merge(&mut self, other: Location) {
        if other.latitude.is_some() {
            self.latitude = other.latitude;
        }
        if other.longitude.is_some() {
            self.longitude = other.longitude;
        }
        if other.city.is_some() {
            self.city = other.city;
        }
        if other.provider.is_some() {
            self.provider = other.provider;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.city.is_none()
            && self.provider.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub height: u64,
    pub hash: String,
    /// Milliseconds between the block being authored and the node importing it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_hash: Option<String>,
}

/// Node IO history; wire shape `[stateCacheSize[]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeIo {
    pub state_cache_size: Vec<f64>,
}

/// Network bandwidth history; wire shape `[upload[], download[], timestamps[]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeHardware {
    pub upload: Vec<f64>,
    pub download: Vec<f64>,
    pub timestamps: Vec<f64>,
}
