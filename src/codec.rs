//! Wire encoding and export
//!
//! Blocks and transactions travel as `bincode`; chains are exported as
//! pretty-printed JSON for display. Decoding enforces size limits before
//! touching the payload.

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::transaction::{Transaction, MAX_TRANSACTION_SIZE};

/// Maximum encoded block size in bytes (10MB)
pub const MAX_BLOCK_SIZE: usize = 10 * 1024 * 1024;

pub fn encode_transaction(tx: &Transaction) -> Result<Vec<u8>, ChainError> {
    let bytes = bincode::serialize(tx)?;
    check_size("Transaction", bytes.len(), MAX_TRANSACTION_SIZE)?;
    Ok(bytes)
}

pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, ChainError> {
    check_size("Transaction", bytes.len(), MAX_TRANSACTION_SIZE)?;
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_block(block: &Block) -> Result<Vec<u8>, ChainError> {
    let bytes = bincode::serialize(block)?;
    check_size("Block", bytes.len(), MAX_BLOCK_SIZE)?;
    Ok(bytes)
}

pub fn decode_block(bytes: &[u8]) -> Result<Block, ChainError> {
    check_size("Block", bytes.len(), MAX_BLOCK_SIZE)?;
    Ok(bincode::deserialize(bytes)?)
}

pub fn chain_to_json(chain: &[Block]) -> Result<String, ChainError> {
    Ok(serde_json::to_string_pretty(chain)?)
}

pub fn chain_from_json(json: &str) -> Result<Vec<Block>, ChainError> {
    Ok(serde_json::from_str(json)?)
}

fn check_size(kind: &str, len: usize, max: usize) -> Result<(), ChainError> {
    if len > max {
        return Err(ChainError::Serialization(format!(
            "{} too large: {} bytes (max: {})",
            kind, len, max
        )));
    }
    Ok(())
}
