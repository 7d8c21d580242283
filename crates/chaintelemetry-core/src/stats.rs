//! Chain-wide statistics and the store holding the latest snapshot.

use serde::{Deserialize, Serialize};

/// A `[from, to?]` bucket used by memory and benchmark rankings.
pub type RangeBucket = (u64, Option<u64>);

/// Histogram of observed values: `(value, count)` pairs plus overflow buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking<T> {
    pub list: Vec<(T, u64)>,
    /// Nodes whose value fell outside `list`.
    #[serde(default)]
    pub other: u64,
    /// Nodes that did not report a value.
    #[serde(default)]
    pub unknown: u64,
}

impl<T> Ranking<T> {
    /// Number of nodes accounted for by this ranking.
    pub fn total(&self) -> u64 {
        self.list.iter().map(|(_, count)| count).sum::<u64>() + self.other + self.unknown
    }

    /// The most common value, if any were reported.
    pub fn top(&self) -> Option<&(T, u64)> {
        self.list.iter().max_by_key(|(_, count)| *count)
    }
}

/// Every ranking the feed reports for the subscribed chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_os: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_arch: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Ranking<RangeBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_count: Option<Ranking<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_kernel: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_distro: Option<Ranking<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_virtual_machine: Option<Ranking<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_hashrate_score: Option<Ranking<RangeBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_memcpy_score: Option<Ranking<RangeBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_sequential_write_score: Option<Ranking<RangeBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_random_write_score: Option<Ranking<RangeBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_vendor: Option<Ranking<String>>,
}

/// Holds the latest [`ChainStats`]; each update replaces it wholesale.
#[derive(Debug, Default)]
pub struct ChainStatsStore {
    current: Option<ChainStats>,
}

impl ChainStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot. Nothing from the previous one survives.
    pub fn replace(&mut self, stats: ChainStats) {
        self.current = Some(stats);
    }

    pub fn get(&self) -> Option<&ChainStats> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(json: serde_json::Value) -> ChainStats {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_feed_stats_object() {
        let s = stats(serde_json::json!({
            "version": { "list": [["1.0.0", 10], ["0.9.0", 2]], "other": 1, "unknown": 3 },
            "memory": { "list": [[[0, 4], 5], [[32, null], 7]], "other": 0, "unknown": 0 },
            "is_virtual_machine": { "list": [[false, 9]], "other": 0, "unknown": 1 }
        }));
        let version = s.version.as_ref().unwrap();
        assert_eq!(version.total(), 16);
        assert_eq!(version.top(), Some(&("1.0.0".to_string(), 10)));
        assert_eq!(s.memory.as_ref().unwrap().list[1].0, (32, None));
        assert!(s.cpu.is_none());
    }

    #[test]
    fn replace_is_wholesale() {
        let mut store = ChainStatsStore::new();
        assert!(store.get().is_none());

        store.replace(stats(serde_json::json!({
            "version": { "list": [["1.0.0", 1]], "other": 0, "unknown": 0 },
            "cpu": { "list": [["Ryzen", 1]], "other": 0, "unknown": 0 }
        })));
        store.replace(stats(serde_json::json!({
            "cpu_vendor": { "list": [["AMD", 4]], "other": 0, "unknown": 0 }
        })));

        let current = store.get().unwrap();
        assert!(current.version.is_none(), "fields from the previous snapshot must not survive");
        assert!(current.cpu.is_none());
        assert_eq!(current.cpu_vendor.as_ref().unwrap().total(), 4);

        store.clear();
        assert!(store.get().is_none());
    }
}
