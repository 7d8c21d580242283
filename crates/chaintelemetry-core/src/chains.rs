//! Well-known chains and feed constants.

/// Identifier of a chain on the feed: the hex-encoded genesis block hash.
pub type GenesisHash = String;

/// Feed protocol version this client implements.
pub const FEED_VERSION: u64 = 32;

/// Public Polkadot telemetry feed.
pub const DEFAULT_FEED_URL: &str = "wss://feed.telemetry.polkadot.io/feed/";

/// Kusama genesis hash.
pub const KUSAMA: &str = "0xb0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe";

/// Polkadot genesis hash.
pub const POLKADOT: &str = "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";

/// Resolve a chain by its lowercase name, or pass a `0x…` hash through.
pub fn by_name(name: &str) -> Option<GenesisHash> {
    match name.to_ascii_lowercase().as_str() {
        "kusama" | "ksm" => Some(KUSAMA.to_string()),
        "polkadot" | "dot" => Some(POLKADOT.to_string()),
        other if other.starts_with("0x") && other.len() > 2 => Some(name.to_string()),
        _ => None,
    }
}
