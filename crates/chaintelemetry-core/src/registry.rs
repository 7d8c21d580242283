//! Node registry: node id → [`NodeRecord`], folded from feed events.
//!
//! Merge rules:
//! - `AddedNode` always (re)inserts, replacing any previous record for the id.
//! - Every other node event is a no-op for an id that is not present, so
//!   updates racing a removal never resurrect a node.
//! - Hardware and IO histories are replaced wholesale; block, location and
//!   counters are merged field by field.
//! - `stale` only ever goes from `false` to `true`.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;

use crate::message::{AddedNode, BlockDetails, FeedMessage, NodeStats};
use crate::node::{BlockInfo, Location, NodeHardware, NodeId, NodeIo, NodeRecord};

/// What applying an event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    Removed,
    Updated,
    /// The node exists but the event had nothing to change.
    Unchanged,
    /// The event targets an id that is not in the registry.
    UnknownNode,
    /// The event does not carry node state.
    NotApplicable,
}

impl ApplyOutcome {
    /// Returns `true` if the registry contents changed.
    pub fn changed(self) -> bool {
        matches!(
            self,
            Self::Inserted | Self::Replaced | Self::Removed | Self::Updated
        )
    }
}

/// In-memory node registry.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, NodeRecord>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, message: FeedMessage) -> ApplyOutcome {
        match message {
            FeedMessage::AddedNode(node) => self.create(*node),
            FeedMessage::RemovedNode(id) => match self.remove(id) {
                Some(_) => ApplyOutcome::Removed,
                None => ApplyOutcome::UnknownNode,
            },
            FeedMessage::LocatedNode {
                id,
                latitude,
                longitude,
                city,
            } => self.locate(id, latitude, longitude, city),
            FeedMessage::ImportedBlock { id, block } => self.import_block(id, block),
            FeedMessage::FinalizedBlock { id, height, hash } => {
                self.finalize_block(id, height, hash)
            }
            FeedMessage::NodeStatsUpdate { id, stats } => self.update_stats(id, stats),
            FeedMessage::Hardware { id, hardware } => self.update_hardware(id, hardware),
            FeedMessage::NodeIOUpdate { id, io } => self.update_io(id, io),
            FeedMessage::StaleNode(id) => self.mark_stale(id),
            FeedMessage::FeedVersion(_)
            | FeedMessage::ChainStatsUpdate(_)
            | FeedMessage::Ignored(_) => ApplyOutcome::NotApplicable,
        }
    }

    /// Insert a node, replacing any existing record with the same id.
    pub fn create(&mut self, node: AddedNode) -> ApplyOutcome {
        let record = node.into_record(Utc::now());
        match self.nodes.insert(record.id, record) {
            Some(_) => ApplyOutcome::Replaced,
            None => ApplyOutcome::Inserted,
        }
    }

    /// Remove a node. Removing an absent id is fine and returns `None`.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeRecord> {
        self.nodes.remove(&id)
    }

    pub fn update_stats(&mut self, id: NodeId, stats: NodeStats) -> ApplyOutcome {
        self.modify(id, |node| {
            node.network.peer_count = stats.peers;
            node.transaction_count = stats.txcount;
            true
        })
    }

    pub fn update_hardware(&mut self, id: NodeId, hardware: NodeHardware) -> ApplyOutcome {
        self.modify(id, |node| {
            node.hardware = Some(hardware);
            true
        })
    }

    pub fn update_io(&mut self, id: NodeId, io: NodeIo) -> ApplyOutcome {
        self.modify(id, |node| {
            node.io = Some(io);
            true
        })
    }

    /// Merge a newly imported block; finalized fields are kept.
    pub fn import_block(&mut self, id: NodeId, details: BlockDetails) -> ApplyOutcome {
        self.modify(id, |node| {
            match node.block.as_mut() {
                Some(block) => {
                    block.height = details.height;
                    block.hash = details.hash;
                    block.propagation_time = details.propagation_time;
                }
                None => node.block = Some(BlockInfo::from(details)),
            }
            true
        })
    }

    /// Record finality. Only applies once the node has reported a block.
    pub fn finalize_block(&mut self, id: NodeId, height: u64, hash: String) -> ApplyOutcome {
        self.modify(id, |node| match node.block.as_mut() {
            Some(block) => {
                block.finalized_height = Some(height);
                block.finalized_hash = Some(hash);
                true
            }
            None => false,
        })
    }

    pub fn locate(
        &mut self,
        id: NodeId,
        latitude: f64,
        longitude: f64,
        city: String,
    ) -> ApplyOutcome {
        self.modify(id, |node| {
            node.location.get_or_insert_with(Location::default).merge(Location {
                latitude: Some(latitude),
                longitude: Some(longitude),
                city: Some(city),
                provider: None,
            });
            true
        })
    }

    pub fn mark_stale(&mut self, id: NodeId) -> ApplyOutcome {
        self.modify(id, |node| {
            if node.stale {
                return false;
            }
            node.stale = true;
            true
        })
    }

    /// Merge a geolocation lookup result for the node reporting `ip`.
    ///
    /// Ignored if the node has gone, or was re-added with a different IP
    /// while the lookup was in flight.
    pub fn enrich_location(&mut self, id: NodeId, ip: &str, location: Location) -> ApplyOutcome {
        if location.is_empty() {
            return if self.contains(id) {
                ApplyOutcome::Unchanged
            } else {
                ApplyOutcome::UnknownNode
            };
        }
        self.modify(id, |node| {
            if node.network.ip.as_deref() != Some(ip) {
                return false;
            }
            node.location.get_or_insert_with(Location::default).merge(location);
            true
        })
    }

    /// Run `f` on the node if present; `f` returns whether it changed anything.
    fn modify(&mut self, id: NodeId, f: impl FnOnce(&mut NodeRecord) -> bool) -> ApplyOutcome {
        let Some(node) = self.nodes.get_mut(&id) else {
            tracing::trace!(id, "update for unknown node ignored");
            return ApplyOutcome::UnknownNode;
        };
        if f(node) {
            node.updated_at = Utc::now();
            ApplyOutcome::Updated
        } else {
            ApplyOutcome::Unchanged
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Snapshot of every node, unordered.
    pub fn nodes(&self) -> Vec<NodeRecord> {
        self.nodes.values().cloned().collect()
    }

    pub fn filtered(&self, predicate: impl Fn(&NodeRecord) -> bool) -> Vec<NodeRecord> {
        self.nodes
            .values()
            .filter(|node| predicate(node))
            .cloned()
            .collect()
    }

    pub fn sorted(
        &self,
        mut compare: impl FnMut(&NodeRecord, &NodeRecord) -> Ordering,
    ) -> Vec<NodeRecord> {
        let mut nodes = self.nodes();
        nodes.sort_by(|a, b| compare(a, b));
        nodes
    }
}
