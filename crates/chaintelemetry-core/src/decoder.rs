//! Turns one raw feed frame into a [`FeedMessage`].
//!
//! Frames are JSON arrays `[actionCode, payload]`. The decoder is pure: it
//! never looks at registry state, so a frame always decodes the same way.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::action::Action;
use crate::error::DecodeError;
use crate::message::{AddedNode, BlockDetails, FeedMessage, NodeStats};
use crate::node::{NodeHardware, NodeId, NodeIo};
use crate::stats::ChainStats;

/// Stateless feed frame decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedDecoder;

impl FeedDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a text frame.
    pub fn decode(&self, frame: &str) -> Result<FeedMessage, DecodeError> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| DecodeError::malformed(format!("invalid JSON: {e}")))?;
        self.decode_value(value)
    }

    /// Decode an already-parsed frame.
    pub fn decode_value(&self, frame: Value) -> Result<FeedMessage, DecodeError> {
        let Value::Array(items) = frame else {
            return Err(DecodeError::malformed("frame is not an array"));
        };
        let pair: Result<[Value; 2], Vec<Value>> = items.try_into();
        let Ok([code, payload]) = pair else {
            return Err(DecodeError::malformed("expected [action, payload]"));
        };
        let code = code
            .as_u64()
            .ok_or_else(|| DecodeError::malformed(format!("action code {code} is not an integer")))?;
        let action = Action::from_code(code).ok_or(DecodeError::UnknownAction { code })?;

        let message = match action {
            Action::FeedVersion => FeedMessage::FeedVersion(payload_as(action, payload)?),
            Action::AddedNode => {
                FeedMessage::AddedNode(Box::new(payload_as::<AddedNode>(action, payload)?))
            }
            Action::RemovedNode => FeedMessage::RemovedNode(payload_as(action, payload)?),
            Action::LocatedNode => {
                let (id, latitude, longitude, city): (NodeId, f64, f64, String) =
                    payload_as(action, payload)?;
                FeedMessage::LocatedNode {
                    id,
                    latitude,
                    longitude,
                    city,
                }
            }
            Action::ImportedBlock => {
                let (id, block): (NodeId, BlockDetails) = payload_as(action, payload)?;
                FeedMessage::ImportedBlock { id, block }
            }
            Action::FinalizedBlock => {
                let (id, height, hash): (NodeId, u64, String) = payload_as(action, payload)?;
                FeedMessage::FinalizedBlock { id, height, hash }
            }
            Action::NodeStatsUpdate => {
                let (id, stats): (NodeId, NodeStats) = payload_as(action, payload)?;
                FeedMessage::NodeStatsUpdate { id, stats }
            }
            Action::Hardware => {
                let (id, hardware): (NodeId, NodeHardware) = payload_as(action, payload)?;
                FeedMessage::Hardware { id, hardware }
            }
            Action::NodeIOUpdate => {
                let (id, io): (NodeId, NodeIo) = payload_as(action, payload)?;
                FeedMessage::NodeIOUpdate { id, io }
            }
            Action::StaleNode => FeedMessage::StaleNode(payload_as(action, payload)?),
            Action::ChainStatsUpdate => {
                FeedMessage::ChainStatsUpdate(Box::new(payload_as::<ChainStats>(action, payload)?))
            }
            Action::BestBlock
            | Action::BestFinalized
            | Action::TimeSync
            | Action::AddedChain
            | Action::RemovedChain
            | Action::SubscribedTo
            | Action::UnsubscribedFrom
            | Action::Pong => FeedMessage::Ignored(action),
        };
        Ok(message)
    }
}

fn payload_as<T: DeserializeOwned>(action: Action, payload: Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|e| DecodeError::InvalidPayload {
        action,
        reason: e.to_string(),
    })
}
