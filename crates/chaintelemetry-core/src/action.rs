//! Feed action codes.

use std::fmt;

/// Every action code the telemetry feed protocol defines.
///
/// Codes `0x10`–`0x13` are unassigned; anything outside this table is an
/// unknown action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    FeedVersion = 0x00,
    BestBlock = 0x01,
    BestFinalized = 0x02,
    AddedNode = 0x03,
    RemovedNode = 0x04,
    LocatedNode = 0x05,
    ImportedBlock = 0x06,
    FinalizedBlock = 0x07,
    NodeStatsUpdate = 0x08,
    Hardware = 0x09,
    TimeSync = 0x0a,
    AddedChain = 0x0b,
    RemovedChain = 0x0c,
    SubscribedTo = 0x0d,
    UnsubscribedFrom = 0x0e,
    Pong = 0x0f,
    StaleNode = 0x14,
    NodeIOUpdate = 0x15,
    ChainStatsUpdate = 0x16,
}

impl Action {
    /// All known actions, in code order.
    pub const ALL: [Action; 19] = [
        Action::FeedVersion,
        Action::BestBlock,
        Action::BestFinalized,
        Action::AddedNode,
        Action::RemovedNode,
        Action::LocatedNode,
        Action::ImportedBlock,
        Action::FinalizedBlock,
        Action::NodeStatsUpdate,
        Action::Hardware,
        Action::TimeSync,
        Action::AddedChain,
        Action::RemovedChain,
        Action::SubscribedTo,
        Action::UnsubscribedFrom,
        Action::Pong,
        Action::StaleNode,
        Action::NodeIOUpdate,
        Action::ChainStatsUpdate,
    ];

    /// Look up an action by its wire code.
    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| u64::from(a.code()) == code)
    }

    /// The wire code of this action.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FeedVersion => "FeedVersion",
            Self::BestBlock => "BestBlock",
            Self::BestFinalized => "BestFinalized",
            Self::AddedNode => "AddedNode",
            Self::RemovedNode => "RemovedNode",
            Self::LocatedNode => "LocatedNode",
            Self::ImportedBlock => "ImportedBlock",
            Self::FinalizedBlock => "FinalizedBlock",
            Self::NodeStatsUpdate => "NodeStatsUpdate",
            Self::Hardware => "Hardware",
            Self::TimeSync => "TimeSync",
            Self::AddedChain => "AddedChain",
            Self::RemovedChain => "RemovedChain",
            Self::SubscribedTo => "SubscribedTo",
            Self::UnsubscribedFrom => "UnsubscribedFrom",
            Self::Pong => "Pong",
            Self::StaleNode => "StaleNode",
            Self::NodeIOUpdate => "NodeIOUpdate",
            Self::ChainStatsUpdate => "ChainStatsUpdate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
