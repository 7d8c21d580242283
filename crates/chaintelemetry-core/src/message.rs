//! Decoded feed events and their positional payload shapes.
//!
//! Payload structs deserialize straight from the JSON arrays the feed sends,
//! field order matching array position.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::action::Action;
use crate::node::{
    Benchmarks, BlockInfo, Location, NetworkInfo, NodeHardware, NodeId, NodeIo, NodeRecord,
    SystemInfo,
};
use crate::stats::ChainStats;

/// One semantic event decoded from a feed frame.
///
/// Only [`FeedDecoder`](crate::decoder::FeedDecoder) constructs these from the
/// wire; [`NodeRegistry::apply`](crate::registry::NodeRegistry::apply)
/// matches every variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    FeedVersion(u64),
    AddedNode(Box<AddedNode>),
    RemovedNode(NodeId),
    LocatedNode {
        id: NodeId,
        latitude: f64,
        longitude: f64,
        city: String,
    },
    ImportedBlock {
        id: NodeId,
        block: BlockDetails,
    },
    FinalizedBlock {
        id: NodeId,
        height: u64,
        hash: String,
    },
    NodeStatsUpdate {
        id: NodeId,
        stats: NodeStats,
    },
    Hardware {
        id: NodeId,
        hardware: NodeHardware,
    },
    NodeIOUpdate {
        id: NodeId,
        io: NodeIo,
    },
    StaleNode(NodeId),
    ChainStatsUpdate(Box<ChainStats>),
    /// A known action this client does not act on (chain switching,
    /// chain-wide best block, time sync, pong).
    Ignored(Action),
}

impl FeedMessage {
    pub fn action(&self) -> Action {
        match self {
            Self::FeedVersion(_) => Action::FeedVersion,
            Self::AddedNode(_) => Action::AddedNode,
            Self::RemovedNode(_) => Action::RemovedNode,
            Self::LocatedNode { .. } => Action::LocatedNode,
            Self::ImportedBlock { .. } => Action::ImportedBlock,
            Self::FinalizedBlock { .. } => Action::FinalizedBlock,
            Self::NodeStatsUpdate { .. } => Action::NodeStatsUpdate,
            Self::Hardware { .. } => Action::Hardware,
            Self::NodeIOUpdate { .. } => Action::NodeIOUpdate,
            Self::StaleNode(_) => Action::StaleNode,
            Self::ChainStatsUpdate(_) => Action::ChainStatsUpdate,
            Self::Ignored(action) => *action,
        }
    }

    /// The node this event targets, if it targets one.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::AddedNode(node) => Some(node.id),
            Self::RemovedNode(id) | Self::StaleNode(id) => Some(*id),
            Self::LocatedNode { id, .. }
            | Self::ImportedBlock { id, .. }
            | Self::FinalizedBlock { id, .. }
            | Self::NodeStatsUpdate { id, .. }
            | Self::Hardware { id, .. }
            | Self::NodeIOUpdate { id, .. } => Some(*id),
            Self::FeedVersion(_) | Self::ChainStatsUpdate(_) | Self::Ignored(_) => None,
        }
    }
}

/// Full node snapshot carried by `AddedNode`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddedNode {
    pub id: NodeId,
    pub details: NodeDetails,
    pub stats: NodeStats,
    pub io: Option<NodeIo>,
    pub hardware: Option<NodeHardware>,
    pub block: Option<BlockDetails>,
    pub location: Option<NodeLocation>,
    #[serde(default)]
    pub startup_time: Option<u64>,
}

/// `[name, impl, version, validator?, peerId?, targetOS, targetArch, targetEnv, ip?, sysInfo, hwbench?]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeDetails {
    pub name: String,
    pub implementation: String,
    pub version: String,
    pub validator: Option<String>,
    pub network_id: Option<String>,
    pub target_os: Option<String>,
    pub target_arch: Option<String>,
    pub target_env: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub sysinfo: Option<NodeSysInfo>,
    #[serde(default)]
    pub hwbench: Option<Benchmarks>,
}

/// System information object as the feed sends it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeSysInfo {
    pub cpu: Option<String>,
    pub memory: Option<u64>,
    pub core_count: Option<u32>,
    pub linux_kernel: Option<String>,
    pub linux_distro: Option<String>,
    pub is_virtual_machine: Option<bool>,
}

/// `[peerCount, transactionCount]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NodeStats {
    pub peers: u64,
    pub txcount: u64,
}

/// `[height, hash, blockTime, timestamp, propagationTime?]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockDetails {
    pub height: u64,
    pub hash: String,
    pub block_time: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub propagation_time: Option<u64>,
}

/// `[latitude, longitude, city]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

impl From<NodeLocation> for Location {
    fn from(loc: NodeLocation) -> Self {
        Location {
            latitude: Some(loc.latitude),
            longitude: Some(loc.longitude),
            city: Some(loc.city),
            provider: None,
        }
    }
}

impl From<BlockDetails> for BlockInfo {
    fn from(block: BlockDetails) -> Self {
        BlockInfo {
            height: block.height,
            hash: block.hash,
            propagation_time: block.propagation_time,
            finalized_height: None,
            finalized_hash: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl AddedNode {
    /// Build the registry record for this snapshot.
    pub fn into_record(self, now: DateTime<Utc>) -> NodeRecord {
        let AddedNode {
            id,
            details,
            stats,
            io,
            hardware,
            block,
            location,
            startup_time,
        } = self;
        let sysinfo = details.sysinfo.unwrap_or_default();

        NodeRecord {
            id,
            name: details.name,
            implementation: details.implementation,
            version: details.version,
            validator: non_empty(details.validator),
            network: NetworkInfo {
                peer_count: stats.peers,
                peer_id: non_empty(details.network_id),
                ip: non_empty(details.ip),
            },
            system: SystemInfo {
                cpu: sysinfo.cpu.unwrap_or_default(),
                memory: sysinfo.memory.unwrap_or_default(),
                core_count: sysinfo.core_count.unwrap_or_default(),
                is_virtual_machine: sysinfo.is_virtual_machine.unwrap_or_default(),
                kernel: sysinfo.linux_kernel,
                distribution: sysinfo.linux_distro,
                target_os: non_empty(details.target_os),
                target_arch: non_empty(details.target_arch),
                target_env: non_empty(details.target_env),
                benchmarks: details.hwbench,
            },
            location: location.map(Location::from),
            block: block.map(BlockInfo::from),
            transaction_count: stats.txcount,
            startup_time,
            io,
            hardware,
            stale: false,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::FeedDecoder;

    #[test]
    fn action_and_target_node() {
        let decoder = FeedDecoder::new();

        let stats = decoder.decode("[8, [5, [20, 3]]]").unwrap();
        assert_eq!(stats.action(), Action::NodeStatsUpdate);
        assert_eq!(stats.node_id(), Some(5));

        let stale = decoder.decode("[20, 9]").unwrap();
        assert_eq!(stale.action(), Action::StaleNode);
        assert_eq!(stale.node_id(), Some(9));

        let version = decoder.decode("[0, 32]").unwrap();
        assert_eq!(version.action(), Action::FeedVersion);
        assert_eq!(version.node_id(), None);
    }
}
