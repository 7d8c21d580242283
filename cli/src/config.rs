//! CLI configuration: optional JSON file, then environment, then flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use chaintelemetry_geo::IpInfoConfig;
use chaintelemetry_ws::ClientConfig;

use crate::logging::LogConfig;

pub const TOKEN_ENV: &str = "IPINFO_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub client: ClientConfig,
    /// Chain name ("kusama", "polkadot") or genesis hash
    #[serde(default)]
    pub chain: Option<String>,
    /// Enables location enrichment when present
    #[serde(default)]
    pub ip_info: Option<IpInfoConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))
    }

    /// Build from `--config` (if given), `IPINFO_TOKEN`, and flags.
    pub fn from_args(args: &[String], env_token: Option<String>) -> Result<Self, String> {
        let mut config = match parse_flag(args, "--config") {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            config.set_token(token);
        }
        config.apply_flags(args);
        Ok(config)
    }

    fn apply_flags(&mut self, args: &[String]) {
        if let Some(url) = parse_flag(args, "--url") {
            self.client.url = url;
        }
        if let Some(chain) = parse_flag(args, "--chain") {
            self.chain = Some(chain);
        }
        if let Some(token) = parse_flag(args, "--ipinfo-token") {
            self.set_token(token);
        }
        if let Some(level) = parse_flag(args, "--log-level") {
            self.log.level = level;
        }
        if has_flag(args, "--json-logs") {
            self.log.json = true;
        }
        if has_flag(args, "--no-reconnect") {
            self.client.auto_reconnect = false;
        }
    }

    fn set_token(&mut self, token: String) {
        match &mut self.ip_info {
            Some(ip_info) => ip_info.token = token,
            None => self.ip_info = Some(IpInfoConfig::new(token)),
        }
    }
}

pub fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_override_defaults() {
        let config = CliConfig::from_args(
            &args(&["--url", "ws://localhost:8000/feed", "--chain", "polkadot", "--json-logs"]),
            None,
        )
        .unwrap();
        assert_eq!(config.client.url, "ws://localhost:8000/feed");
        assert_eq!(config.chain.as_deref(), Some("polkadot"));
        assert!(config.log.json);
        assert!(config.client.auto_reconnect);
        assert!(config.ip_info.is_none());
    }

    #[test]
    fn token_flag_beats_environment() {
        let config = CliConfig::from_args(&[], Some("from-env".into())).unwrap();
        assert_eq!(config.ip_info.unwrap().token, "from-env");

        let config = CliConfig::from_args(
            &args(&["--ipinfo-token", "from-flag"]),
            Some("from-env".into()),
        )
        .unwrap();
        assert_eq!(config.ip_info.unwrap().token, "from-flag");

        let config = CliConfig::from_args(&[], Some(String::new())).unwrap();
        assert!(config.ip_info.is_none());
    }

    #[test]
    fn file_sections_parse() {
        let config: CliConfig = serde_json::from_str(
            r#"{
                "client": {"max_reconnect_attempts": 10},
                "ip_info": {"token": "abc", "cache_ttl_secs": 60},
                "log": {"level": "debug"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.client.max_reconnect_attempts, 10);
        assert_eq!(config.ip_info.unwrap().cache_ttl_secs, 60);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = CliConfig::from_args(&args(&["--config", "/nonexistent/cli.json"]), None)
            .unwrap_err();
        assert!(err.contains("cannot read config"));
    }

    #[test]
    fn flag_without_value() {
        assert_eq!(parse_flag(&args(&["--name"]), "--name"), None);
        assert_eq!(parse_flag(&args(&["--name", "x"]), "--name").as_deref(), Some("x"));
    }
}
