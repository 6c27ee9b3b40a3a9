//! Chain synchronization between peers
//!
//! Implements the longest-valid-chain rule over snapshots of peer chains.
//! Chains are compared by length only, not by accumulated work.

use crate::blockchain::{Block, Blockchain};
use tracing::debug;

/// Snapshot of one peer's chain taken for conflict resolution
#[derive(Debug, Clone)]
pub struct PeerChain {
    pub peer: String,
    pub blocks: Vec<Block>,
}

impl PeerChain {
    pub fn new(peer: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            peer: peer.into(),
            blocks,
        }
    }
}

/// Pick the longest candidate that is strictly longer than `local` and valid
/// under `local`'s rules. Earlier candidates win length ties.
pub fn select_longest_chain(local: &Blockchain, candidates: Vec<PeerChain>) -> Option<PeerChain> {
    let mut best_len = local.blocks.len();
    let mut best = None;

    for candidate in candidates {
        if candidate.blocks.len() <= best_len {
            continue;
        }
        if !local.valid_chain(&candidate.blocks) {
            debug!(
                peer = %candidate.peer,
                len = candidate.blocks.len(),
                "ignoring invalid peer chain"
            );
            continue;
        }
        best_len = candidate.blocks.len();
        best = Some(candidate);
    }

    best
}
