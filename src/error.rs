//! Error types for PeerLedger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("'coinbase' is reserved for miner rewards")]
    ReservedSender,
    #[error("Insufficient balance for {address}: available {available}, required {required}")]
    InsufficientBalance {
        address: String,
        available: i64,
        required: i64,
    },
    #[error("Pending pool is full ({0} transactions)")]
    MempoolFull(usize),
    #[error("Mining is already running on this node")]
    MiningAlreadyRunning,
    #[error("Mining was cancelled")]
    MiningCancelled,
    #[error("Mining exceeded the configured time limit")]
    MiningTimedOut,
    #[error("Difficulty {0} can never be met by a 64-digit hash")]
    UnreachableDifficulty(u32),
    #[error("Nonce space exhausted without meeting the difficulty target")]
    NonceExhausted,
    #[error("Mined block no longer extends the chain tip")]
    StaleTip,
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Background task failed: {0}")]
    TaskFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
