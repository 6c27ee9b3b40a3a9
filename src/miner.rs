//! Proof-of-work search
//!
//! A block satisfies its target when the hex form of its content hash starts
//! with `difficulty` '0' characters. The search is a linear scan over the
//! nonce starting from the block's current nonce.

use crate::blockchain::Block;
use crate::crypto::HASH_HEX_LEN;
use crate::error::ChainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// Nonces tried between two reads of the cancellation flag
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// True when `hash` starts with at least `difficulty` hex zeros.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let needed = difficulty as usize;
    hash.len() >= needed && hash.bytes().take(needed).all(|b| b == b'0')
}

/// Mine `block` to completion. Only fails if the nonce space runs out.
pub fn mine_block(block: Block) -> Result<Block, ChainError> {
    search(block, None)
}

/// Mine `block`, abandoning the search once `cancel` is set.
pub fn mine_block_cancellable(block: Block, cancel: &AtomicBool) -> Result<Block, ChainError> {
    search(block, Some(cancel))
}

fn search(mut block: Block, cancel: Option<&AtomicBool>) -> Result<Block, ChainError> {
    if block.difficulty as usize > HASH_HEX_LEN {
        return Err(ChainError::UnreachableDifficulty(block.difficulty));
    }
    let started = Instant::now();
    let first_nonce = block.nonce;
    // The transaction set is fixed for the whole search.
    let root = Block::transactions_root(&block.transactions);

    loop {
        if let Some(flag) = cancel {
            let checkpoint = (block.nonce - first_nonce) % CANCEL_CHECK_INTERVAL == 0;
            if checkpoint && flag.load(Ordering::Relaxed) {
                debug!(index = block.index, nonce = block.nonce, "proof-of-work search cancelled");
                return Err(ChainError::MiningCancelled);
            }
        }

        let hash = block.content_hash_with_root(&root);
        if meets_difficulty(&hash, block.difficulty) {
            debug!(
                index = block.index,
                nonce = block.nonce,
                attempts = block.nonce - first_nonce + 1,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "proof-of-work found"
            );
            block.hash = Some(hash);
            return Ok(block);
        }

        block.nonce = block.nonce.checked_add(1).ok_or(ChainError::NonceExhausted)?;
    }
}
