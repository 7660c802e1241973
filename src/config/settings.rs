use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::transaction::{ChainId, GOLOS_CHAIN_ID};
use crate::error::{GolosError, Result};
use crate::network::{NodeEndpoint, RetryPolicy};
use crate::wallet::ADDRESS_PREFIX;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::load);

static DEFAULT_NODES: &[&str] = &[
    "wss://golosd.privex.io",
    "wss://api.golos.blckchnd.com/ws",
    "wss://golos.lexai.host/ws",
    "wss://apinode.golos.today/ws",
];

const CONFIG_PATH_KEY: &str = "GOLOS_CONFIG";
const NODES_KEY: &str = "GOLOS_NODES";
const CONNECT_RETRIES_KEY: &str = "GOLOS_CONNECT_RETRIES";
const CALL_RETRIES_KEY: &str = "GOLOS_CALL_RETRIES";
const CHAIN_ID_KEY: &str = "GOLOS_CHAIN_ID";
const ADDRESS_PREFIX_KEY: &str = "GOLOS_ADDRESS_PREFIX";
const EXPIRATION_SECS_KEY: &str = "GOLOS_EXPIRATION_SECS";
const TIMEOUT_MS_KEY: &str = "GOLOS_TIMEOUT_MS";

/// Client settings, layered as defaults, then a TOML file, then environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nodes: Vec<String>,
    /// Connection attempts across the pool before giving up
    pub connect_retries: u32,
    /// Attempts per RPC call, reconnecting between them
    pub call_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub timeout_ms: u64,
    pub shuffle_nodes: bool,
    pub chain_id: String,
    pub address_prefix: String,
    pub expiration_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nodes: DEFAULT_NODES.iter().map(|s| s.to_string()).collect(),
            connect_retries: 20,
            call_retries: 20,
            backoff_base_ms: 2000,
            backoff_max_ms: 10000,
            timeout_ms: 30000,
            shuffle_nodes: true,
            chain_id: GOLOS_CHAIN_ID.to_string(),
            address_prefix: ADDRESS_PREFIX.to_string(),
            expiration_secs: 60,
        }
    }
}

impl Config {
    /// Layered config for the process. Falls back to defaults with a warning when the
    /// file or environment cannot be used.
    pub fn load() -> Config {
        match Config::try_load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid configuration, using defaults: {e}");
                Config::default()
            }
        }
    }

    pub fn try_load() -> Result<Config> {
        let mut config = match env::var(CONFIG_PATH_KEY) {
            Ok(path) => {
                info!("Loading configuration from {path}");
                Config::from_file(path)?
            }
            Err(_) => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            GolosError::Config(format!("Cannot read {}: {e}", path.as_ref().display()))
        })?;
        Config::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `GOLOS_*` overrides from `lookup`, normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(nodes) = lookup(NODES_KEY) {
            self.nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup(CONNECT_RETRIES_KEY) {
            self.connect_retries = parse_number(CONNECT_RETRIES_KEY, &value)?;
        }
        if let Some(value) = lookup(CALL_RETRIES_KEY) {
            self.call_retries = parse_number(CALL_RETRIES_KEY, &value)?;
        }
        if let Some(value) = lookup(CHAIN_ID_KEY) {
            self.chain_id = value.trim().to_string();
        }
        if let Some(value) = lookup(ADDRESS_PREFIX_KEY) {
            self.address_prefix = value.trim().to_string();
        }
        if let Some(value) = lookup(EXPIRATION_SECS_KEY) {
            self.expiration_secs = parse_number(EXPIRATION_SECS_KEY, &value)?;
        }
        if let Some(value) = lookup(TIMEOUT_MS_KEY) {
            self.timeout_ms = parse_number(TIMEOUT_MS_KEY, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(GolosError::Config("Node list is empty".to_string()));
        }
        for node in &self.nodes {
            NodeEndpoint::new(node)?;
        }
        self.chain_id()?;
        if self.address_prefix.is_empty() {
            return Err(GolosError::Config("Address prefix is empty".to_string()));
        }
        if self.connect_retries == 0 || self.call_retries == 0 {
            return Err(GolosError::Config("Retry budgets must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn chain_id(&self) -> Result<ChainId> {
        ChainId::from_hex(&self.chain_id)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_retries,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    pub fn call_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.call_retries,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GolosError::Config(format!("{key} must be a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.chain_id().unwrap(), ChainId::golos());
        assert_eq!(config.connect_policy().max_attempts, 20);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nodes = [\"ws://127.0.0.1:8091\"]").unwrap();
        writeln!(file, "call_retries = 3").unwrap();
        writeln!(file, "shuffle_nodes = false").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.nodes, vec!["ws://127.0.0.1:8091"]);
        assert_eq!(config.call_retries, 3);
        assert!(!config.shuffle_nodes);
        assert_eq!(config.connect_retries, 20);
        assert_eq!(config.address_prefix, "GLS");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GOLOS_NODES", "ws://a:1, wss://b/ws"),
            ("GOLOS_CONNECT_RETRIES", "4"),
            ("GOLOS_EXPIRATION_SECS", "120"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.nodes, vec!["ws://a:1", "wss://b/ws"]);
        assert_eq!(config.connect_retries, 4);
        assert_eq!(config.expiration_secs, 120);

        let bad = HashMap::from([("GOLOS_TIMEOUT_MS", "soon")]);
        assert!(config
            .apply_overrides(|key| bad.get(key).map(|v| v.to_string()))
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            nodes: vec!["http://a".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            chain_id: "beef".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            address_prefix: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            nodes: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("nodes = 5"),
            Err(GolosError::Config(_))
        ));
    }
}
