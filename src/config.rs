//! Configuration management for PeerLedger

use crate::crypto::HASH_HEX_LEN;
use crate::error::ChainError;
use crate::mempool::DEFAULT_MAX_PENDING;
use crate::transaction::COINBASE_SENDER;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default configuration file looked up by the demo driver
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Leading hex zeros required of every mined block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_block_reward")]
    pub block_reward: i64,
    #[serde(default = "default_faucet_address")]
    pub faucet_address: String,
    #[serde(default = "default_faucet_allocation")]
    pub faucet_allocation: i64,
    #[serde(default = "default_max_pending")]
    pub max_pending_transactions: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            block_reward: default_block_reward(),
            faucet_address: default_faucet_address(),
            faucet_allocation: default_faucet_allocation(),
            max_pending_transactions: default_max_pending(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Abandon a node's proof-of-work search after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl MinerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_peers")]
    pub peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
        }
    }
}

fn default_difficulty() -> u32 {
    3
}

fn default_block_reward() -> i64 {
    50
}

fn default_faucet_address() -> String {
    "faucet".to_string()
}

fn default_faucet_allocation() -> i64 {
    10_000
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

fn default_peers() -> Vec<String> {
    vec!["P1".to_string(), "P2".to_string(), "P3".to_string()]
}

impl Config {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        let ledger = &self.ledger;
        if ledger.difficulty as usize > HASH_HEX_LEN {
            return Err(ChainError::Config(format!(
                "ledger.difficulty {} exceeds the {} hex digits of a block hash",
                ledger.difficulty, HASH_HEX_LEN
            )));
        }
        if ledger.faucet_address.is_empty() {
            return Err(ChainError::Config("ledger.faucet_address must be set".to_string()));
        }
        if ledger.faucet_address == COINBASE_SENDER {
            return Err(ChainError::Config(format!(
                "ledger.faucet_address cannot be the reserved sender '{}'",
                COINBASE_SENDER
            )));
        }
        if ledger.faucet_allocation <= 0 {
            return Err(ChainError::Config("ledger.faucet_allocation must be positive".to_string()));
        }
        if ledger.block_reward < 0 {
            return Err(ChainError::Config("ledger.block_reward cannot be negative".to_string()));
        }
        if ledger.max_pending_transactions == 0 {
            return Err(ChainError::Config(
                "ledger.max_pending_transactions must be at least 1".to_string(),
            ));
        }
        if self.network.peers.is_empty() {
            return Err(ChainError::Config("network.peers must name at least one node".to_string()));
        }
        let mut seen = HashSet::new();
        for name in &self.network.peers {
            if !seen.insert(name.as_str()) {
                return Err(ChainError::Config(format!("duplicate peer name '{}'", name)));
            }
        }
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let source = fs::read_to_string(path)?;
    Config::from_toml_str(&source)
}
